//! Import entity
//!
//! An import groups artifacts uploaded together. `complete` only ever moves from false to true.

use sea_orm::{entity::prelude::*, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "imports")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	/// Opaque caller-supplied key/value data
	pub meta: Json,
	pub complete: bool,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::artifact::Entity")]
	Artifact,
	#[sea_orm(has_many = "super::import_task::Entity")]
	ImportTask,
}

impl Related<super::artifact::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Artifact.def()
	}
}

impl Related<super::import_task::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::ImportTask.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

/// Query predicate on the `complete` flag
pub fn complete_is(complete: bool) -> SimpleExpr {
	Column::Complete.eq(complete)
}
