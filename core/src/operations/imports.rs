//! Imports: groups of artifacts that get post-processed together once marked complete

use crate::infrastructure::database::entities::{artifact, import, Artifact, Import};

use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
	QueryFilter, QueryOrder, Set,
};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
	#[error("import not found: <uuid={0}>")]
	ImportNotFound(Uuid),
	#[error("import meta must be a JSON object, got: {0}")]
	InvalidMeta(Value),
	#[error("import <uuid={0}> is complete and can't be reopened")]
	CompleteIsMonotonic(Uuid),

	// Internal errors
	#[error("database error: {0}")]
	Database(#[from] DbErr),
}

/// Outcome of [`ImportStore::set_complete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
	/// The import just became complete, import-level processing should be enqueued
	Completed,
	AlreadyComplete,
	/// The import was and stays incomplete
	Unchanged,
}

pub struct ImportStore<'a, C> {
	db: &'a C,
}

impl<'a, C: ConnectionTrait> ImportStore<'a, C> {
	pub const fn new(db: &'a C) -> Self {
		Self { db }
	}

	/// Creates an empty, incomplete import. Missing meta is stored as an empty object.
	#[instrument(skip(self), err)]
	pub async fn create(&self, meta: Option<Value>) -> Result<import::Model, ImportError> {
		let meta = match meta {
			None => Value::Object(Map::new()),
			Some(meta @ Value::Object(_)) => meta,
			Some(other) => return Err(ImportError::InvalidMeta(other)),
		};

		let now = Utc::now();

		let created = import::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			meta: Set(meta),
			complete: Set(false),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(self.db)
		.await?;

		debug!(uuid = %created.uuid, "Created import");

		Ok(created)
	}

	pub async fn get(&self, uuid: Uuid) -> Result<import::Model, ImportError> {
		Import::find()
			.filter(import::Column::Uuid.eq(uuid))
			.one(self.db)
			.await?
			.ok_or(ImportError::ImportNotFound(uuid))
	}

	/// Imports in creation order, optionally restricted to complete or incomplete ones
	pub async fn list(&self, complete: Option<bool>) -> Result<Vec<import::Model>, ImportError> {
		let mut query = Import::find().order_by_asc(import::Column::CreatedAt);

		if let Some(complete) = complete {
			query = query.filter(import::complete_is(complete));
		}

		Ok(query.all(self.db).await?)
	}

	/// Artifacts of an import in creation order
	pub async fn artifacts_of(&self, uuid: Uuid) -> Result<Vec<artifact::Model>, ImportError> {
		let import = self.get(uuid).await?;

		Ok(Artifact::find()
			.filter(artifact::Column::ImportId.eq(import.id))
			.order_by_asc(artifact::Column::CreatedAt)
			.order_by_asc(artifact::Column::Id)
			.all(self.db)
			.await?)
	}

	/// Updates the `complete` flag, which can only ever go from false to true
	#[instrument(skip(self), err)]
	pub async fn set_complete(&self, uuid: Uuid, complete: bool) -> Result<Completion, ImportError> {
		let import = self.get(uuid).await?;

		let completion = match (import.complete, complete) {
			(true, true) => return Ok(Completion::AlreadyComplete),
			(true, false) => return Err(ImportError::CompleteIsMonotonic(uuid)),
			(false, false) => return Ok(Completion::Unchanged),
			(false, true) => Completion::Completed,
		};

		let mut active = import.into_active_model();
		active.complete = Set(true);
		active.updated_at = Set(Utc::now());
		active.update(self.db).await?;

		debug!(%uuid, "Import complete");

		Ok(completion)
	}
}
