//! Tag entity
//!
//! A tag is a node in the tag DAG. Its edges live in `tags_relations`, its names in `tag_labels`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::tag_label::Entity")]
	TagLabel,
}

impl Related<super::tag_label::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::TagLabel.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
