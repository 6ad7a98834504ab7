use crate::infrastructure::database::entities::{
	tag, tag_label, tag_relation, Tag, TagLabel, TagRelation,
};

use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use tracing::{debug, instrument};

use super::{normalize_label, TagError, TagGraphStore};

impl<C> TagGraphStore<'_, C>
where
	C: ConnectionTrait + TransactionTrait,
{
	/// Resolves a label path such as `["animals", "cats"]` to the tag of its last element.
	///
	/// The first label must belong to a root tag (one without parents), every following label to
	/// a child of the previous match, compared case-insensitively. With `create` set, missing steps
	/// are created below the previous step; the first created tag becomes a root when nothing
	/// matched before it.
	#[instrument(skip(self), err)]
	pub async fn by_label_path(
		&self,
		path: &[&str],
		create: bool,
	) -> Result<tag::Model, TagError> {
		if path.is_empty() {
			return Err(TagError::EmptyLabelPath);
		}

		let txn = self.db.begin().await?;
		let store = TagGraphStore::new(&txn);

		let mut previous: Option<i32> = None;
		for label in path {
			let label = normalize_label(label)?;
			let labelled = store.tags_labelled(&label).await?;

			let mut matches = match previous {
				None => store.roots_among(labelled).await?,
				Some(parent) => {
					let children = store.children_of(parent).await?;
					labelled.intersection(&children).copied().collect()
				}
			}
			.into_iter();

			let found = match (matches.next(), matches.next()) {
				(Some(id), None) => id,
				(Some(_), Some(_)) => {
					return Err(TagError::AmbiguousLabelPath {
						path: owned(path),
						label,
					})
				}
				(None, _) if !create => return Err(TagError::LabelPathNotFound(owned(path))),
				(None, _) => store.create_step(previous, &label).await?,
			};

			previous = Some(found);
		}

		let Some(id) = previous else {
			return Err(TagError::EmptyLabelPath);
		};

		let tag = Tag::find_by_id(id)
			.one(&txn)
			.await?
			.ok_or(TagError::TagNotFound(id))?;

		txn.commit().await?;

		Ok(tag)
	}

	async fn tags_labelled(&self, label: &str) -> Result<HashSet<i32>, TagError> {
		Ok(TagLabel::find()
			.filter(tag_label::label_matches(label))
			.all(self.db)
			.await?
			.into_iter()
			.map(|label| label.tag_id)
			.collect())
	}

	async fn roots_among(&self, tags: HashSet<i32>) -> Result<HashSet<i32>, TagError> {
		if tags.is_empty() {
			return Ok(tags);
		}

		let children = TagRelation::find()
			.filter(tag_relation::Column::ChildId.is_in(tags.iter().copied()))
			.all(self.db)
			.await?
			.into_iter()
			.map(|edge| edge.child_id)
			.collect::<HashSet<_>>();

		Ok(tags.difference(&children).copied().collect())
	}

	async fn create_step(&self, parent: Option<i32>, label: &str) -> Result<i32, TagError> {
		let tag = self.insert_tag().await?;
		self.add_label(tag.id, label, &[]).await?;

		if let Some(parent_id) = parent {
			TagRelation::insert(tag_relation::ActiveModel {
				parent_id: Set(parent_id),
				child_id: Set(tag.id),
			})
			.exec_without_returning(self.db)
			.await?;
		}

		debug!(tag_id = tag.id, ?parent, %label, "Created tag for label path");

		Ok(tag.id)
	}
}

fn owned(path: &[&str]) -> Vec<String> {
	path.iter().map(ToString::to_string).collect()
}
