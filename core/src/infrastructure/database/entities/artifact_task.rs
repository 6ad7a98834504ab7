//! Records which artifact plugins have finished for an artifact

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artifact_tasks")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	/// Plugin name
	pub name: String,
	pub artifact_id: i32,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::artifact::Entity",
		from = "Column::ArtifactId",
		to = "super::artifact::Column::Id",
		on_delete = "Cascade"
	)]
	Artifact,
}

impl Related<super::artifact::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Artifact.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
