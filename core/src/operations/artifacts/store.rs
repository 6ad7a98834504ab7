use crate::infrastructure::database::entities::{artifact, import, Artifact, Import};

use std::{
	io,
	path::{Component, Path, PathBuf},
	sync::Arc,
};

use chrono::Utc;
use marmolada_utils::error::{FileIOError, FileOp};
use sea_orm::{
	ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IntoActiveModel, QueryFilter,
	Set, TransactionTrait,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, error, instrument, trace, warn};
use uuid::Uuid;

use super::{content_type, ArtifactError, FileLedger};

/// A database transaction paired with the file changes made under it.
///
/// Finalize it with [`StoreTransaction::commit`] or [`StoreTransaction::rollback`]; dropping it
/// unfinished rolls back both the database and the files written through it.
#[derive(Debug)]
pub struct StoreTransaction {
	txn: DatabaseTransaction,
	ledger: FileLedger,
}

impl StoreTransaction {
	/// The underlying database transaction, for queries that go along with file operations
	pub const fn conn(&self) -> &DatabaseTransaction {
		&self.txn
	}

	pub const fn ledger(&self) -> &FileLedger {
		&self.ledger
	}

	/// Commits the database first and only then unlinks removed files. If the database commit
	/// fails, files added under this transaction are removed again.
	///
	/// A crash between both steps leaves orphaned files behind, never a row pointing to a
	/// missing file.
	pub async fn commit(self) -> Result<(), ArtifactError> {
		let Self { txn, ledger } = self;

		match txn.commit().await {
			Ok(()) => {
				for e in ledger.on_commit() {
					error!("Failed to remove file after commit: {e:#}");
				}
				Ok(())
			}
			Err(e) => {
				for e in ledger.on_rollback() {
					error!("Failed to remove file after failed commit: {e:#}");
				}
				Err(e.into())
			}
		}
	}

	pub async fn rollback(self) -> Result<(), ArtifactError> {
		let Self { txn, ledger } = self;

		let res = txn.rollback().await;

		for e in ledger.on_rollback() {
			error!("Failed to remove file after rollback: {e:#}");
		}

		res.map_err(Into::into)
	}
}

/// What a caller knows about an artifact before its payload arrives
#[derive(Debug, Clone, Default)]
pub struct NewArtifact {
	/// Falls back to [`content_type::OCTET_STREAM`] until a payload is written
	pub content_type: Option<String>,
	pub source_uri: Option<String>,
	pub file_name: Option<String>,
}

/// Keeps artifact payloads below `root` in step with the transactions that reference them
#[derive(Debug, Clone)]
pub struct ArtifactFileStore {
	root: Arc<Path>,
}

impl ArtifactFileStore {
	pub fn new(root: impl AsRef<Path>) -> Self {
		Self {
			root: Arc::from(root.as_ref()),
		}
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Absolute location of an artifact's payload
	#[must_use]
	pub fn full_path(&self, artifact: &artifact::Model) -> PathBuf {
		self.root.join(artifact.relative_path())
	}

	pub async fn begin(
		&self,
		db: &impl TransactionTrait,
	) -> Result<StoreTransaction, ArtifactError> {
		Ok(StoreTransaction {
			txn: db.begin().await?,
			ledger: FileLedger::default(),
		})
	}

	/// Inserts an artifact row for the import `import_uuid` with its default storage path
	#[instrument(skip(self, tx), err)]
	pub async fn create_artifact(
		&self,
		tx: &StoreTransaction,
		import_uuid: Uuid,
		new: NewArtifact,
	) -> Result<artifact::Model, ArtifactError> {
		let import = Import::find()
			.filter(import::Column::Uuid.eq(import_uuid))
			.one(tx.conn())
			.await?
			.ok_or(ArtifactError::ImportNotFound(import_uuid))?;

		let uuid = Uuid::new_v4();
		let now = Utc::now();

		let path = artifact::default_path(import.id, uuid, new.file_name.as_deref());
		let path = validate_relative(&path)?.to_owned();

		let created = artifact::ActiveModel {
			uuid: Set(uuid),
			import_id: Set(import.id),
			content_type: Set(new
				.content_type
				.unwrap_or_else(|| content_type::OCTET_STREAM.to_owned())),
			path: Set(path),
			source_uri: Set(new.source_uri),
			file_name: Set(new.file_name),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(tx.conn())
		.await?;

		debug!(%uuid, path = %created.path, "Created artifact");

		Ok(created)
	}

	pub async fn get(
		&self,
		tx: &StoreTransaction,
		uuid: Uuid,
	) -> Result<artifact::Model, ArtifactError> {
		Artifact::find()
			.filter(artifact::Column::Uuid.eq(uuid))
			.one(tx.conn())
			.await?
			.ok_or(ArtifactError::ArtifactNotFound(uuid))
	}

	/// Stores `data` as the artifact's payload. The payload is written exactly once: an existing
	/// file at the artifact's path fails with [`ArtifactError::AlreadyExists`].
	///
	/// The content type is re-detected from the written bytes.
	#[instrument(skip(self, tx, data), fields(len = data.len()), err)]
	pub async fn write(
		&self,
		tx: &mut StoreTransaction,
		uuid: Uuid,
		data: &[u8],
	) -> Result<artifact::Model, ArtifactError> {
		let artifact = self.get(tx, uuid).await?;
		let full_path = self.full_path(&artifact);

		create_parent_dirs(&full_path).await?;

		let mut file = match fs::OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(&full_path)
			.await
		{
			Ok(file) => file,
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
				return Err(ArtifactError::AlreadyExists(full_path));
			}
			Err(e) => return Err(FileIOError::new(FileOp::Create, &full_path, e).into()),
		};

		// From here on the file is ours to clean up if anything fails
		tx.ledger.record_added(&full_path);

		file.write_all(data)
			.await
			.map_err(|e| FileIOError::new(FileOp::Write, &full_path, e))?;
		file.sync_all()
			.await
			.map_err(|e| FileIOError::new(FileOp::Write, &full_path, e))?;

		let content_type = content_type::sniff(data, artifact.file_name.as_deref());
		trace!(%content_type, "Detected content type");

		self.update_content_type(tx, artifact, content_type).await
	}

	/// Reads the artifact's payload. Payloads deleted under this transaction are gone already,
	/// even though the file is still on disk until commit.
	#[instrument(skip(self, tx), err)]
	pub async fn read(&self, tx: &StoreTransaction, uuid: Uuid) -> Result<Vec<u8>, ArtifactError> {
		let artifact = self.get(tx, uuid).await?;
		let full_path = self.full_path(&artifact);

		if tx.ledger.is_removed(&full_path) {
			return Err(ArtifactError::PayloadNotFound(uuid));
		}

		match fs::read(&full_path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				Err(ArtifactError::PayloadNotFound(uuid))
			}
			Err(e) => Err(FileIOError::new(FileOp::Read, &full_path, e).into()),
		}
	}

	/// Marks the artifact's payload for removal once the transaction commits
	#[instrument(skip(self, tx), err)]
	pub async fn delete(&self, tx: &mut StoreTransaction, uuid: Uuid) -> Result<(), ArtifactError> {
		let artifact = self.get(tx, uuid).await?;
		tx.ledger.record_removed(self.full_path(&artifact));

		Ok(())
	}

	/// Deletes the artifact row and schedules its payload for removal
	pub async fn remove_artifact(
		&self,
		tx: &mut StoreTransaction,
		uuid: Uuid,
	) -> Result<(), ArtifactError> {
		let artifact = self.get(tx, uuid).await?;
		tx.ledger.record_removed(self.full_path(&artifact));

		Artifact::delete_by_id(artifact.id).exec(tx.conn()).await?;

		debug!(%uuid, "Removed artifact");

		Ok(())
	}

	/// Changes the artifact's storage path. An existing payload is hardlinked to the new path
	/// (copied if linking fails), and the old path is removed when the transaction commits. Until
	/// then both paths hold the payload.
	#[instrument(skip(self, tx), err)]
	pub async fn move_to(
		&self,
		tx: &mut StoreTransaction,
		uuid: Uuid,
		new_path: &str,
	) -> Result<artifact::Model, ArtifactError> {
		let new_path = validate_relative(new_path)?;
		let artifact = self.get(tx, uuid).await?;

		if artifact.path == new_path {
			return Ok(artifact);
		}

		let old_full_path = self.full_path(&artifact);
		let new_full_path = self.root.join(new_path);

		let has_payload = fs::try_exists(&old_full_path)
			.await
			.map_err(|e| FileIOError::new(FileOp::Read, &old_full_path, e))?;

		if has_payload {
			create_parent_dirs(&new_full_path).await?;
			link_or_copy(&old_full_path, &new_full_path).await?;
			tx.ledger.record_added(&new_full_path);
		}

		let mut active = artifact.into_active_model();
		active.path = Set(new_path.to_owned());
		active.updated_at = Set(Utc::now());

		match active.update(tx.conn()).await {
			Ok(moved) => {
				// The old payload only goes once the row no longer points to it
				if has_payload {
					tx.ledger.record_removed(&old_full_path);
				}
				Ok(moved)
			}
			Err(e) => {
				if let Err(e) = tx.ledger.undo_added(&new_full_path) {
					error!("Failed to remove link of failed move: {e:#}");
				}
				Err(e.into())
			}
		}
	}

	/// Attaches a file that already exists on the server as the artifact's payload
	#[instrument(skip(self, tx), err)]
	pub async fn link_local_file(
		&self,
		tx: &mut StoreTransaction,
		uuid: Uuid,
		source: &Path,
	) -> Result<artifact::Model, ArtifactError> {
		match fs::metadata(source).await {
			Ok(metadata) if metadata.is_file() => {}
			Ok(_) => return Err(ArtifactError::NotALocalFile(source.to_path_buf())),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(ArtifactError::NotALocalFile(source.to_path_buf()))
			}
			Err(e) => return Err(FileIOError::new(FileOp::Read, source, e).into()),
		}

		let artifact = self.get(tx, uuid).await?;
		let full_path = self.full_path(&artifact);

		create_parent_dirs(&full_path).await?;
		link_or_copy(source, &full_path).await?;
		tx.ledger.record_added(&full_path);

		Ok(artifact)
	}

	pub async fn set_content_type(
		&self,
		tx: &StoreTransaction,
		uuid: Uuid,
		content_type: String,
	) -> Result<artifact::Model, ArtifactError> {
		let artifact = self.get(tx, uuid).await?;
		self.update_content_type(tx, artifact, content_type).await
	}

	async fn update_content_type(
		&self,
		tx: &StoreTransaction,
		artifact: artifact::Model,
		content_type: String,
	) -> Result<artifact::Model, ArtifactError> {
		if artifact.content_type == content_type {
			return Ok(artifact);
		}

		let mut active = artifact.into_active_model();
		active.content_type = Set(content_type);
		active.updated_at = Set(Utc::now());

		Ok(active.update(tx.conn()).await?)
	}
}

/// Storage paths stay below the store root
fn validate_relative(path: &str) -> Result<&str, ArtifactError> {
	let trimmed = artifact::normalize_path(path);

	let escapes = Path::new(trimmed)
		.components()
		.any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

	if trimmed.is_empty() || escapes {
		return Err(ArtifactError::InvalidPath(path.to_owned()));
	}

	Ok(trimmed)
}

async fn create_parent_dirs(path: &Path) -> Result<(), FileIOError> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)
			.await
			.map_err(|e| FileIOError::new(FileOp::CreateDir, parent, e))?;
	}

	Ok(())
}

/// Hardlinks `from` to `to`, falling back to a copy where linking is not possible, e.g. across
/// filesystems. An existing `to` is never overwritten.
async fn link_or_copy(from: &Path, to: &Path) -> Result<(), ArtifactError> {
	let linked = fs::hard_link(from, to).await;
	copy_unless_linked(from, to, linked).await
}

async fn copy_unless_linked(
	from: &Path,
	to: &Path,
	linked: io::Result<()>,
) -> Result<(), ArtifactError> {
	match linked {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
			Err(ArtifactError::AlreadyExists(to.to_path_buf()))
		}
		Err(e) => {
			warn!(?from, ?to, "Hardlinking failed, copying instead: {e:#}");

			if fs::try_exists(to)
				.await
				.map_err(|e| FileIOError::new(FileOp::Read, to, e))?
			{
				return Err(ArtifactError::AlreadyExists(to.to_path_buf()));
			}

			fs::copy(from, to)
				.await
				.map(|_| ())
				.map_err(|e| FileIOError::new(FileOp::Copy, to, e).into())
		}
	}
}
