//! Association between tag labels and the languages they are valid in

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag_labels_languages")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub tag_label_id: i32,
	#[sea_orm(primary_key, auto_increment = false)]
	pub language_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::tag_label::Entity",
		from = "Column::TagLabelId",
		to = "super::tag_label::Column::Id",
		on_delete = "Cascade"
	)]
	TagLabel,
	#[sea_orm(
		belongs_to = "super::language::Entity",
		from = "Column::LanguageId",
		to = "super::language::Column::Id",
		on_delete = "Cascade"
	)]
	Language,
}

impl ActiveModelBehavior for ActiveModel {}
