use sea_orm::DbErr;
use uuid::Uuid;

use super::Scope;

#[derive(thiserror::Error, Debug)]
pub enum TaskEngineError {
	#[error("discover_plugins() must be called before process_scope()")]
	DiscoveryNotRun,
	#[error("unknown scope: {0}")]
	UnknownScope(String),
	#[error("{scope} not found: <uuid={uuid}>")]
	EntityNotFound { scope: Scope, uuid: Uuid },

	// Internal errors
	#[error("database error: {0}")]
	Database(#[from] DbErr),
}

/// Reasons a plugin descriptor is dropped during discovery
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPlugin {
	#[error("unknown scope: {0:?}")]
	UnknownScope(String),
	#[error("`name` must be set")]
	MissingName,
	#[error("`process` must be set")]
	MissingProcess,
	#[error("`dependencies` must all be non-empty names")]
	EmptyDependency,
	#[error("duplicate scope/name: {scope}/{name}")]
	Duplicate { scope: Scope, name: String },
}

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
	#[error("job queue is closed")]
	QueueClosed,
}
