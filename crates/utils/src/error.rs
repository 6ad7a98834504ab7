use std::{fmt, io, path::Path};

use thiserror::Error;
use tracing::error;

/// Log an error that can't be propagated any further, e.g. from a finalizer
pub fn report_error(context: &str, res: &Result<(), impl fmt::Display>) {
	if let Err(e) = res {
		error!("{context}: {e:#}");
	}
}

/// The filesystem operation a [`FileIOError`] was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
	CreateDir,
	Create,
	Write,
	Read,
	HardLink,
	Copy,
	Remove,
}

impl fmt::Display for FileOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::CreateDir => "create directory",
			Self::Create => "create",
			Self::Write => "write",
			Self::Read => "read",
			Self::HardLink => "hardlink",
			Self::Copy => "copy",
			Self::Remove => "remove",
		})
	}
}

/// File I/O error that keeps the path and the operation that caused it
#[derive(Error, Debug)]
#[error("failed to {op} '{}': {source}", .path.display())]
pub struct FileIOError {
	pub op: FileOp,
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
}

impl FileIOError {
	pub fn new(op: FileOp, path: impl AsRef<Path>, source: io::Error) -> Self {
		Self {
			op,
			path: path.as_ref().into(),
			source,
		}
	}

	#[must_use]
	pub fn kind(&self) -> io::ErrorKind {
		self.source.kind()
	}
}
