use std::{collections::HashSet, sync::OnceLock};

use marmolada_utils::error::report_error;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
	records::{record_success, Recorded},
	resolver::{self, ResolvedPlugins},
	PluginContext, PluginRegistry, Scope, TaskEngineError,
};

/// What happened to each plugin of a scope during one [`TaskPluginEngine::process_scope`] call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeReport {
	pub succeeded: Vec<String>,
	pub failed: Vec<String>,
	/// Plugins not run because a dependency failed or was skipped itself
	pub skipped: Vec<String>,
}

/// Runs task plugins for artifacts and imports.
///
/// Share it behind an `Arc`: after [`TaskPluginEngine::discover_plugins`] the resolved order is
/// immutable, so any number of `process_scope` calls may run concurrently.
#[derive(Debug)]
pub struct TaskPluginEngine {
	ctx: PluginContext,
	registry: PluginRegistry,
	resolved: OnceLock<ResolvedPlugins>,
}

impl TaskPluginEngine {
	pub fn new(ctx: PluginContext, registry: PluginRegistry) -> Self {
		Self {
			ctx,
			registry,
			resolved: OnceLock::new(),
		}
	}

	/// Validates the registered plugins and resolves their order. Only the first call does any
	/// work.
	pub fn discover_plugins(&self) {
		self.resolved.get_or_init(|| {
			let resolved = resolver::resolve(self.registry.descriptors());

			info!(
				artifact = resolved.get(&Scope::Artifact).map_or(0, Vec::len),
				import = resolved.get(&Scope::Import).map_or(0, Vec::len),
				"Discovered task plugins",
			);

			resolved
		});
	}

	/// Resolved plugin names of `scope` in execution order
	pub fn plugin_order(&self, scope: Scope) -> Result<Vec<&str>, TaskEngineError> {
		let resolved = self.resolved.get().ok_or(TaskEngineError::DiscoveryNotRun)?;

		Ok(resolved
			.get(&scope)
			.map(|plugins| plugins.iter().map(|p| p.name.as_str()).collect())
			.unwrap_or_default())
	}

	/// Runs every plugin of `scope` for the entity `uuid`, strictly one after the other.
	///
	/// A failing plugin doesn't stop the run, but every plugin depending on it (directly or
	/// through another skipped plugin) is skipped. Each success is recorded in its own
	/// transaction right after the plugin returned.
	#[instrument(skip_all, fields(%scope, %uuid))]
	pub async fn process_scope(
		&self,
		scope: Scope,
		uuid: Uuid,
	) -> Result<ScopeReport, TaskEngineError> {
		let resolved = self.resolved.get().ok_or(TaskEngineError::DiscoveryNotRun)?;

		let mut report = ScopeReport::default();

		let Some(plugins) = resolved.get(&scope) else {
			debug!("No task plugins for scope");
			return Ok(report);
		};

		let mut failed = HashSet::<&str>::new();

		for plugin in plugins {
			let unfulfilled = plugin
				.dependencies
				.iter()
				.map(String::as_str)
				.filter(|dep| failed.contains(dep))
				.collect::<Vec<_>>();

			if !unfulfilled.is_empty() {
				warn!(
					plugin = %plugin.name,
					"Skipping task plugin due to unfulfilled deps: {}",
					unfulfilled.join(", "),
				);
				failed.insert(&plugin.name);
				report.skipped.push(plugin.name.clone());
				continue;
			}

			debug!(plugin = %plugin.name, "Running task plugin");

			if let Err(e) = plugin.process.run(self.ctx.clone(), uuid).await {
				error!(plugin = %plugin.name, "Task plugin raised an error: {e:#}");
				failed.insert(&plugin.name);
				report.failed.push(plugin.name.clone());
				continue;
			}

			// The plugin did its work, a bookkeeping failure doesn't undo that
			let recorded = record_success(&self.ctx.db, scope, &plugin.name, uuid).await;
			if matches!(recorded, Ok(Recorded::AlreadyRecorded)) {
				debug!(plugin = %plugin.name, "Task was already recorded");
			}
			report_error(
				&format!("Failed to record task {}", plugin.name),
				&recorded.map(|_| ()),
			);

			report.succeeded.push(plugin.name.clone());
		}

		Ok(report)
	}
}
