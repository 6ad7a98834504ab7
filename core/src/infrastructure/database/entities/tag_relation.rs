//! Tag relation entity: one parent -> child edge of the tag DAG

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags_relations")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub parent_id: i32,
	#[sea_orm(primary_key, auto_increment = false)]
	pub child_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::tag::Entity",
		from = "Column::ParentId",
		to = "super::tag::Column::Id",
		on_delete = "Cascade"
	)]
	Parent,
	#[sea_orm(
		belongs_to = "super::tag::Entity",
		from = "Column::ChildId",
		to = "super::tag::Column::Id",
		on_delete = "Cascade"
	)]
	Child,
}

impl ActiveModelBehavior for ActiveModel {}
