//! Task plugins shipped with the core

pub mod file_type;

use crate::infrastructure::tasks::PluginDescriptor;

/// Descriptors of all built-in plugins, in registration order
pub fn builtin() -> Vec<PluginDescriptor> {
	vec![file_type::descriptor()]
}
