//! Tag label entity

use sea_orm::{entity::prelude::*, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag_labels")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	pub tag_id: i32,
	/// Whitespace-normalized label as entered
	pub label: String,
	/// Lower-cased `label`, unique per tag
	pub label_key: String,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::tag::Entity",
		from = "Column::TagId",
		to = "super::tag::Column::Id",
		on_delete = "Cascade"
	)]
	Tag,
}

impl Related<super::tag::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Tag.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

/// Key used for case-insensitive label comparisons
pub fn label_key(normalized_label: &str) -> String {
	normalized_label.to_lowercase()
}

/// Query predicate matching labels equal to `normalized_label`, ignoring case
pub fn label_matches(normalized_label: &str) -> SimpleExpr {
	Column::LabelKey.eq(label_key(normalized_label))
}
