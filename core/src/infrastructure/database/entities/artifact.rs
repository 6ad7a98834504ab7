//! Artifact entity
//!
//! `path` is relative to the artifact store root and mirrors a real file once a payload is written.

use std::path::Path;

use sea_orm::{entity::prelude::*, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artifacts")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	pub import_id: i32,
	pub content_type: String,
	#[sea_orm(unique)]
	pub path: String,
	pub source_uri: Option<String>,
	pub file_name: Option<String>,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::import::Entity",
		from = "Column::ImportId",
		to = "super::import::Column::Id",
		on_delete = "Cascade"
	)]
	Import,
	#[sea_orm(has_many = "super::artifact_task::Entity")]
	ArtifactTask,
}

impl Related<super::import::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Import.def()
	}
}

impl Related<super::artifact_task::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::ArtifactTask.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// Storage path relative to the store root
	pub fn relative_path(&self) -> &Path {
		Path::new(&self.path)
	}
}

/// Strips trailing separators so `a/b/` and `a/b` name the same artifact path
pub fn normalize_path(path: &str) -> &str {
	path.trim_end_matches('/')
}

/// Query predicate matching the artifact stored at `path`
pub fn path_is(path: &str) -> SimpleExpr {
	Column::Path.eq(normalize_path(path))
}

/// Path a new artifact gets before any caller renames it. Only the last component of
/// `file_name` ends up in it, so the path stays a single file below `incoming/`.
pub fn default_path(import_id: i32, uuid: Uuid, file_name: Option<&str>) -> String {
	match file_name.and_then(storable_file_name) {
		Some(file_name) => format!("incoming/import-{import_id}-artifact-{uuid}-{file_name}"),
		None => format!("incoming/import-{import_id}-artifact-{uuid}"),
	}
}

fn storable_file_name(file_name: &str) -> Option<&str> {
	file_name
		.rsplit(|c| c == '/' || c == '\\')
		.next()
		.map(str::trim)
		.filter(|name| !name.is_empty() && *name != "." && *name != "..")
}
