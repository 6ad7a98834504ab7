//! Plugin validation and dependency ordering

use std::collections::{HashMap, HashSet};

use tracing::{debug, error};

use super::{InvalidPlugin, PluginDescriptor, PluginProcess, Scope};

/// A plugin that passed validation
#[derive(Debug, Clone)]
pub struct TaskPlugin {
	pub scope: Scope,
	pub name: String,
	pub dependencies: Vec<String>,
	pub process: PluginProcess,
}

/// Execution order per scope
pub type ResolvedPlugins = HashMap<Scope, Vec<TaskPlugin>>;

/// Checks one descriptor, collecting every problem with it. `seen` holds the plugins accepted
/// so far, a name already taken within the scope is a duplicate.
pub(super) fn validate(
	descriptor: &PluginDescriptor,
	seen: &HashSet<(Scope, String)>,
) -> Result<TaskPlugin, Vec<InvalidPlugin>> {
	let mut errors = Vec::new();

	let scope = descriptor.scope.parse::<Scope>().ok();
	if scope.is_none() {
		errors.push(InvalidPlugin::UnknownScope(descriptor.scope.clone()));
	}

	let name = descriptor.name.trim();
	if name.is_empty() {
		errors.push(InvalidPlugin::MissingName);
	} else if let Some(scope) = scope {
		if seen.contains(&(scope, name.to_owned())) {
			errors.push(InvalidPlugin::Duplicate {
				scope,
				name: name.to_owned(),
			});
		}
	}

	if descriptor.process.is_none() {
		errors.push(InvalidPlugin::MissingProcess);
	}

	let dependencies = descriptor
		.dependencies
		.as_ref()
		.map(|deps| deps.names().map(ToOwned::to_owned).collect::<Vec<_>>())
		.unwrap_or_default();
	if dependencies.iter().any(|dep| dep.trim().is_empty()) {
		errors.push(InvalidPlugin::EmptyDependency);
	}

	match (scope, descriptor.process.clone()) {
		(Some(scope), Some(process)) if errors.is_empty() => Ok(TaskPlugin {
			scope,
			name: name.to_owned(),
			dependencies,
			process,
		}),
		_ => Err(errors),
	}
}

/// Validates every descriptor and orders the survivors of each scope by their dependencies.
/// Nothing here fails: broken descriptors and unresolvable plugins are logged and left out.
pub(super) fn resolve(descriptors: &[PluginDescriptor]) -> ResolvedPlugins {
	let mut seen = HashSet::new();
	let mut by_scope = HashMap::<Scope, Vec<TaskPlugin>>::new();

	for descriptor in descriptors {
		match validate(descriptor, &seen) {
			Ok(plugin) => {
				seen.insert((plugin.scope, plugin.name.clone()));
				by_scope.entry(plugin.scope).or_default().push(plugin);
			}
			Err(errors) => {
				let errors = errors
					.iter()
					.map(ToString::to_string)
					.collect::<Vec<_>>()
					.join(", ");
				error!(
					scope = %descriptor.scope,
					name = %descriptor.name,
					"Skipping broken task plugin: {errors}",
				);
			}
		}
	}

	by_scope
		.into_iter()
		.map(|(scope, plugins)| {
			let ordered = order(scope, plugins);
			debug!(
				%scope,
				order = ?ordered.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
				"Resolved task plugins",
			);
			(scope, ordered)
		})
		.collect()
}

/// Repeated passes over the pending plugins in registration order. A plugin is taken as soon as
/// all of its dependencies are taken, which includes plugins taken earlier in the same pass. A
/// pass that takes nothing leaves only plugins with missing or cyclic dependencies behind.
pub(super) fn order(scope: Scope, plugins: Vec<TaskPlugin>) -> Vec<TaskPlugin> {
	let mut ordered = Vec::with_capacity(plugins.len());
	let mut taken = HashSet::with_capacity(plugins.len());
	let mut pending = plugins;

	while !pending.is_empty() {
		let before = pending.len();
		let mut blocked = Vec::new();

		for plugin in pending {
			if plugin.dependencies.iter().all(|dep| taken.contains(dep)) {
				taken.insert(plugin.name.clone());
				ordered.push(plugin);
			} else {
				blocked.push(plugin);
			}
		}

		if blocked.len() == before {
			let leftovers = blocked
				.iter()
				.map(|p| p.name.as_str())
				.collect::<Vec<_>>()
				.join(", ");
			error!(%scope, "Unresolvable dependencies between task plugins: {leftovers}");
			break;
		}

		pending = blocked;
	}

	ordered
}
