use std::{
	collections::HashSet,
	fs, io, mem,
	path::{Path, PathBuf},
};

use marmolada_utils::error::{FileIOError, FileOp};
use tracing::{error, trace};

/// Filesystem changes made on behalf of one store transaction.
///
/// Payloads are written (or hardlinked) immediately, so `added` holds files that have to go away
/// again if the transaction is rolled back. Removals are deferred: `removed` holds files that
/// only get unlinked once the transaction committed.
///
/// A ledger dropped without being finalized behaves like a rollback.
#[derive(Debug, Default)]
pub struct FileLedger {
	added: HashSet<PathBuf>,
	removed: HashSet<PathBuf>,
}

impl FileLedger {
	/// A file added at a path removed earlier in the same transaction replaces the removal
	pub fn record_added(&mut self, path: impl Into<PathBuf>) {
		let path = path.into();
		trace!(?path, "Recorded added file");
		self.removed.remove(&path);
		self.added.insert(path);
	}

	/// Unlinks a file recorded as added and forgets about it
	pub fn undo_added(&mut self, path: &Path) -> Result<(), FileIOError> {
		if !self.added.remove(path) {
			return Ok(());
		}

		trace!(?path, "Undoing added file");

		unlink_all(HashSet::from([path.to_path_buf()]))
			.into_iter()
			.next()
			.map_or(Ok(()), Err)
	}

	pub fn record_removed(&mut self, path: impl Into<PathBuf>) {
		let path = path.into();
		trace!(?path, "Recorded removed file");
		self.removed.insert(path);
	}

	#[must_use]
	pub fn is_added(&self, path: &Path) -> bool {
		self.added.contains(path)
	}

	#[must_use]
	pub fn is_removed(&self, path: &Path) -> bool {
		self.removed.contains(path)
	}

	/// Unlinks every removed file. Added files are already in place and stay.
	pub fn on_commit(mut self) -> Vec<FileIOError> {
		self.added.clear();
		unlink_all(mem::take(&mut self.removed))
	}

	/// Unlinks every added file. Removed files were never touched and stay.
	pub fn on_rollback(mut self) -> Vec<FileIOError> {
		self.removed.clear();
		unlink_all(mem::take(&mut self.added))
	}
}

impl Drop for FileLedger {
	fn drop(&mut self) {
		if self.added.is_empty() {
			return;
		}

		for e in unlink_all(mem::take(&mut self.added)) {
			error!("Failed to clean up file of unfinished transaction: {e:#}");
		}
	}
}

/// Files that are already gone count as removed
fn unlink_all(paths: HashSet<PathBuf>) -> Vec<FileIOError> {
	paths
		.into_iter()
		.filter_map(|path| match fs::remove_file(&path) {
			Ok(()) => {
				trace!(?path, "Unlinked file");
				None
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => None,
			Err(e) => Some(FileIOError::new(FileOp::Remove, path, e)),
		})
		.collect()
}
