//! Language entity
//!
//! Rows are shared between labels and only ever created through lookup-or-create.

use crate::operations::tags::language::IsoCode;

use sea_orm::{entity::prelude::*, Condition};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "languages")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub lang: String,
	pub territory: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// The `lang[_TERRITORY]` form of this language
	pub fn iso_code(&self) -> String {
		match &self.territory {
			Some(territory) => format!("{}_{territory}", self.lang),
			None => self.lang.clone(),
		}
	}
}

/// Query predicate matching the language row for `code`
pub fn iso_code_is(code: &IsoCode) -> Condition {
	let by_lang = Condition::all().add(Column::Lang.eq(code.lang()));

	match code.territory() {
		Some(territory) => by_lang.add(Column::Territory.eq(territory)),
		None => by_lang.add(Column::Territory.is_null()),
	}
}
