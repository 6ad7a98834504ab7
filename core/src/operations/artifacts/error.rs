use std::path::PathBuf;

use marmolada_utils::error::FileIOError;
use sea_orm::DbErr;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
	#[error("import not found: <uuid={0}>")]
	ImportNotFound(Uuid),
	#[error("artifact not found: <uuid={0}>")]
	ArtifactNotFound(Uuid),
	#[error("no payload for artifact <uuid={0}>")]
	PayloadNotFound(Uuid),
	#[error("payload already exists: '{}'", .0.display())]
	AlreadyExists(PathBuf),
	#[error("invalid artifact path: {0:?}")]
	InvalidPath(String),
	#[error("not a local file: '{}'", .0.display())]
	NotALocalFile(PathBuf),

	// Internal errors
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("database error: {0}")]
	Database(#[from] DbErr),
}

impl ArtifactError {
	/// Errors caused by bad caller input, reported as validation failures rather than missing
	/// resources or server faults.
	#[must_use]
	pub const fn is_validation(&self) -> bool {
		matches!(
			self,
			Self::ImportNotFound(_) | Self::InvalidPath(_) | Self::NotALocalFile(_)
		)
	}
}
