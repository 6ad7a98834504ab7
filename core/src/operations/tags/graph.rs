use crate::infrastructure::database::entities::{tag, tag_relation, Tag, TagRelation};

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
	TransactionTrait,
};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use super::TagError;

/// Which way along the parent/child edges a query walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
	/// Towards parents
	Up,
	/// Towards children
	Down,
}

impl Direction {
	const fn reverse(self) -> Self {
		match self {
			Self::Up => Self::Down,
			Self::Down => Self::Up,
		}
	}

	/// Edge column that must contain the starting tags
	const fn start_column(self) -> tag_relation::Column {
		match self {
			Self::Up => tag_relation::Column::ChildId,
			Self::Down => tag_relation::Column::ParentId,
		}
	}

	const fn neighbour(self, edge: &tag_relation::Model) -> i32 {
		match self {
			Self::Up => edge.parent_id,
			Self::Down => edge.child_id,
		}
	}

	/// Edge linking `tag` to `neighbour` in this direction
	const fn edge(self, tag: i32, neighbour: i32) -> (i32, i32) {
		match self {
			Self::Up => (neighbour, tag),
			Self::Down => (tag, neighbour),
		}
	}
}

/// Tag DAG operations over any connection or transaction
///
/// Mutations open a nested transaction on the given connection, so a caller holding a
/// transaction keeps full control over the final outcome.
pub struct TagGraphStore<'a, C> {
	pub(super) db: &'a C,
}

impl<'a, C> TagGraphStore<'a, C>
where
	C: ConnectionTrait + TransactionTrait,
{
	pub const fn new(db: &'a C) -> Self {
		Self { db }
	}

	/// Creates a tag without edges, labelled with every entry of `labels`
	#[instrument(skip(self), err)]
	pub async fn create_tag(&self, labels: &[&str]) -> Result<tag::Model, TagError> {
		let txn = self.db.begin().await?;
		let store = TagGraphStore::new(&txn);

		let tag = store.insert_tag().await?;
		for label in labels {
			store.add_label(tag.id, label, &[]).await?;
		}

		txn.commit().await?;

		debug!(tag_id = tag.id, %tag.uuid, "Created tag");

		Ok(tag)
	}

	pub(super) async fn insert_tag(&self) -> Result<tag::Model, TagError> {
		let now = Utc::now();

		tag::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(self.db)
		.await
		.map_err(Into::into)
	}

	/// Direct parents of `tag`
	pub async fn parents_of(&self, tag: i32) -> Result<HashSet<i32>, TagError> {
		self.neighbours(&HashSet::from([tag]), Direction::Up)
			.await
			.map_err(Into::into)
	}

	/// Direct children of `tag`
	pub async fn children_of(&self, tag: i32) -> Result<HashSet<i32>, TagError> {
		self.neighbours(&HashSet::from([tag]), Direction::Down)
			.await
			.map_err(Into::into)
	}

	/// Every tag reachable from `tag` by following parent edges, `tag` itself excluded
	pub async fn ancestors_of(&self, tag: i32) -> Result<HashSet<i32>, TagError> {
		self.closure(tag, Direction::Up).await.map_err(Into::into)
	}

	/// Every tag reachable from `tag` by following child edges, `tag` itself excluded
	pub async fn descendants_of(&self, tag: i32) -> Result<HashSet<i32>, TagError> {
		self.closure(tag, Direction::Down).await.map_err(Into::into)
	}

	/// Adds every candidate as a parent of `tag`.
	///
	/// Fails with [`TagError::CyclicGraph`] naming all candidates that are `tag` itself or one of
	/// its descendants, in which case no edge at all is added.
	#[instrument(skip(self), err)]
	pub async fn add_parents(&self, tag: i32, candidates: &[i32]) -> Result<(), TagError> {
		self.link(tag, candidates, Direction::Up).await
	}

	/// Adds every candidate as a child of `tag`, rejecting the whole call if any candidate is
	/// `tag` itself or one of its ancestors.
	#[instrument(skip(self), err)]
	pub async fn add_children(&self, tag: i32, candidates: &[i32]) -> Result<(), TagError> {
		self.link(tag, candidates, Direction::Down).await
	}

	/// Removes the parent edges from `candidates` to `tag`, returning how many existed
	#[instrument(skip(self), err)]
	pub async fn remove_parents(&self, tag: i32, candidates: &[i32]) -> Result<u64, TagError> {
		self.unlink(tag, candidates, Direction::Up).await
	}

	#[instrument(skip(self), err)]
	pub async fn remove_children(&self, tag: i32, candidates: &[i32]) -> Result<u64, TagError> {
		self.unlink(tag, candidates, Direction::Down).await
	}

	pub(super) async fn neighbours(
		&self,
		tags: &HashSet<i32>,
		direction: Direction,
	) -> Result<HashSet<i32>, sea_orm::DbErr> {
		if tags.is_empty() {
			return Ok(HashSet::new());
		}

		Ok(TagRelation::find()
			.filter(direction.start_column().is_in(tags.iter().copied()))
			.all(self.db)
			.await?
			.iter()
			.map(|edge| direction.neighbour(edge))
			.collect())
	}

	/// Frontier expansion: keep pulling in the neighbours of the newest tags until nothing new
	/// shows up. Tags already seen are never expanded twice, so shared ancestors cost one visit.
	async fn closure(
		&self,
		tag: i32,
		direction: Direction,
	) -> Result<HashSet<i32>, sea_orm::DbErr> {
		let mut found = HashSet::new();
		let mut frontier = HashSet::from([tag]);

		while !frontier.is_empty() {
			frontier = self
				.neighbours(&frontier, direction)
				.await?
				.into_iter()
				.filter(|id| found.insert(*id))
				.collect();
		}

		trace!(tag_id = tag, ?direction, size = found.len(), "Computed closure");

		Ok(found)
	}

	async fn ensure_tags_exist(&self, tag: i32, candidates: &[i32]) -> Result<(), TagError> {
		let wanted = candidates
			.iter()
			.copied()
			.chain([tag])
			.collect::<HashSet<_>>();

		let existing = Tag::find()
			.filter(tag::Column::Id.is_in(wanted.iter().copied()))
			.all(self.db)
			.await?
			.into_iter()
			.map(|tag| tag.id)
			.collect::<HashSet<_>>();

		match [tag]
			.iter()
			.chain(candidates)
			.find(|id| !existing.contains(*id))
		{
			Some(missing) => Err(TagError::TagNotFound(*missing)),
			None => Ok(()),
		}
	}

	async fn link(
		&self,
		tag: i32,
		candidates: &[i32],
		direction: Direction,
	) -> Result<(), TagError> {
		self.ensure_tags_exist(tag, candidates).await?;

		// A new parent must not already sit below `tag`, a new child must not sit above it
		let forbidden = self.closure(tag, direction.reverse()).await?;

		let mut offending = Vec::new();
		for &candidate in candidates {
			if (candidate == tag || forbidden.contains(&candidate)) && !offending.contains(&candidate)
			{
				offending.push(candidate);
			}
		}

		if !offending.is_empty() {
			return Err(TagError::CyclicGraph { tag, offending });
		}

		let mut linked = self.neighbours(&HashSet::from([tag]), direction).await?;
		let edges = candidates
			.iter()
			.filter(|candidate| linked.insert(**candidate))
			.map(|&candidate| {
				let (parent_id, child_id) = direction.edge(tag, candidate);
				tag_relation::ActiveModel {
					parent_id: Set(parent_id),
					child_id: Set(child_id),
				}
			})
			.collect::<Vec<_>>();

		if edges.is_empty() {
			return Ok(());
		}

		let count = edges.len();
		let txn = self.db.begin().await?;
		TagRelation::insert_many(edges)
			.exec_without_returning(&txn)
			.await?;
		txn.commit().await?;

		debug!(tag_id = tag, ?direction, count, "Linked tags");

		Ok(())
	}

	async fn unlink(
		&self,
		tag: i32,
		candidates: &[i32],
		direction: Direction,
	) -> Result<u64, TagError> {
		if candidates.is_empty() {
			return Ok(0);
		}

		let (fixed, other) = match direction {
			Direction::Up => (tag_relation::Column::ChildId, tag_relation::Column::ParentId),
			Direction::Down => (tag_relation::Column::ParentId, tag_relation::Column::ChildId),
		};

		let res = TagRelation::delete_many()
			.filter(fixed.eq(tag))
			.filter(other.is_in(candidates.iter().copied()))
			.exec(self.db)
			.await?;

		debug!(tag_id = tag, ?direction, count = res.rows_affected, "Unlinked tags");

		Ok(res.rows_affected)
	}
}
