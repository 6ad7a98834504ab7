use crate::infrastructure::database::entities::{
	language, tag_label, tag_label_language, Language, Tag, TagLabel, TagLabelLanguage,
};

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use marmolada_utils::text::collapse_whitespace;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
	TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{language_by_iso_code, IsoCode, TagError, TagGraphStore};

/// A tag label together with the iso codes of the languages it is valid in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
	pub label: String,
	pub languages: Vec<String>,
}

/// Trims `raw` and collapses whitespace runs. Labels that end up empty are rejected.
pub fn normalize_label(raw: &str) -> Result<String, TagError> {
	let label = collapse_whitespace(raw);

	if label.is_empty() {
		return Err(TagError::InvalidLabel(raw.to_owned()));
	}

	Ok(label)
}

impl<C> TagGraphStore<'_, C>
where
	C: ConnectionTrait + TransactionTrait,
{
	/// Adds a label to `tag`. Labels are unique per tag regardless of case.
	#[instrument(skip(self), err)]
	pub async fn add_label(
		&self,
		tag: i32,
		label: &str,
		languages: &[IsoCode],
	) -> Result<tag_label::Model, TagError> {
		let label = normalize_label(label)?;

		if Tag::find_by_id(tag)
			.one(self.db)
			.await?
			.is_none()
		{
			return Err(TagError::TagNotFound(tag));
		}

		if TagLabel::find()
			.filter(tag_label::Column::TagId.eq(tag))
			.filter(tag_label::label_matches(&label))
			.one(self.db)
			.await?
			.is_some()
		{
			return Err(TagError::DuplicateLabel { tag, label });
		}

		let txn = self.db.begin().await?;
		let now = Utc::now();

		let created = tag_label::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			tag_id: Set(tag),
			label_key: Set(tag_label::label_key(&label)),
			label: Set(label),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(&txn)
		.await?;

		let mut language_ids = HashSet::with_capacity(languages.len());
		for code in languages {
			language_ids.insert(language_by_iso_code(&txn, code).await?.id);
		}

		if !language_ids.is_empty() {
			TagLabelLanguage::insert_many(language_ids.into_iter().map(|language_id| {
				tag_label_language::ActiveModel {
					tag_label_id: Set(created.id),
					language_id: Set(language_id),
				}
			}))
			.exec_without_returning(&txn)
			.await?;
		}

		txn.commit().await?;

		debug!(tag_id = tag, label = %created.label, "Added tag label");

		Ok(created)
	}

	/// Removes the label matching `label` case-insensitively. Languages are kept even when no
	/// label references them anymore.
	#[instrument(skip(self), err)]
	pub async fn remove_label(&self, tag: i32, label: &str) -> Result<bool, TagError> {
		let label = normalize_label(label)?;

		let res = TagLabel::delete_many()
			.filter(tag_label::Column::TagId.eq(tag))
			.filter(tag_label::label_matches(&label))
			.exec(self.db)
			.await?;

		Ok(res.rows_affected > 0)
	}

	/// Labels of `tag` in creation order
	pub async fn labels_of(&self, tag: i32) -> Result<Vec<Label>, TagError> {
		let labels = TagLabel::find()
			.filter(tag_label::Column::TagId.eq(tag))
			.order_by_asc(tag_label::Column::Id)
			.all(self.db)
			.await?;

		if labels.is_empty() {
			return Ok(vec![]);
		}

		let links = TagLabelLanguage::find()
			.filter(tag_label_language::Column::TagLabelId.is_in(labels.iter().map(|l| l.id)))
			.all(self.db)
			.await?;

		let languages = Language::find()
			.filter(
				language::Column::Id.is_in(links.iter().map(|link| link.language_id)),
			)
			.all(self.db)
			.await?
			.into_iter()
			.map(|language| (language.id, language.iso_code()))
			.collect::<HashMap<_, _>>();

		Ok(labels
			.into_iter()
			.map(|label| {
				let mut codes = links
					.iter()
					.filter(|link| link.tag_label_id == label.id)
					.filter_map(|link| languages.get(&link.language_id).cloned())
					.collect::<Vec<_>>();
				codes.sort_unstable();

				Label {
					label: label.label,
					languages: codes,
				}
			})
			.collect())
	}
}
