//! Task record for the import scope: one row per plugin that completed on an import

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_tasks")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	/// Plugin name
	pub name: String,
	pub import_id: i32,
	pub created_at: DateTimeUtc,
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
}

impl Related<super::import::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Import.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
