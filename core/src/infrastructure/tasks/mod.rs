//! Post-processing of artifacts and imports through task plugins
//!
//! Plugins are registered once at startup, validated and ordered by their dependencies per
//! [`Scope`]. [`TaskPluginEngine::process_scope`] then runs the plugins of a scope for a single
//! entity, one after the other, recording every success as a task record.

mod engine;
mod error;
mod plugin;
mod records;
mod resolver;
mod worker;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use engine::{ScopeReport, TaskPluginEngine};
pub use error::{InvalidPlugin, TaskEngineError, WorkerError};
pub use plugin::{Dependencies, PluginContext, PluginDescriptor, PluginProcess, PluginRegistry};
pub use records::task_records;
pub use worker::{job_queue, Job, JobOutcome, JobQueue, JobReceiver, Worker, WorkerStats};

/// The kind of entity a plugin processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
	Artifact,
	Import,
}

impl Scope {
	pub const ALL: [Self; 2] = [Self::Artifact, Self::Import];

	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Artifact => "artifact",
			Self::Import => "import",
		}
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Scope {
	type Err = TaskEngineError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|scope| scope.as_str() == s)
			.ok_or_else(|| TaskEngineError::UnknownScope(s.to_owned()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scope_names_round_trip() {
		for scope in Scope::ALL {
			assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
		}

		assert!(matches!(
			"Artifact".parse::<Scope>(),
			Err(TaskEngineError::UnknownScope(name)) if name == "Artifact"
		));
	}
}
