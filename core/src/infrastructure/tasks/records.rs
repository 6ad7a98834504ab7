//! Task records: which plugins completed for which entity

use crate::infrastructure::database::entities::{
	artifact, artifact_task, import, import_task, Artifact, ArtifactTask, Import, ImportTask,
};

use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
	Set, SqlErr, TransactionTrait,
};
use tracing::trace;
use uuid::Uuid;

use super::{Scope, TaskEngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Recorded {
	Inserted,
	/// The plugin already had a record for this entity, e.g. after a redelivered job
	AlreadyRecorded,
}

async fn entity_id(
	db: &impl ConnectionTrait,
	scope: Scope,
	uuid: Uuid,
) -> Result<Option<i32>, DbErr> {
	Ok(match scope {
		Scope::Artifact => Artifact::find()
			.filter(artifact::Column::Uuid.eq(uuid))
			.one(db)
			.await?
			.map(|artifact| artifact.id),
		Scope::Import => Import::find()
			.filter(import::Column::Uuid.eq(uuid))
			.one(db)
			.await?
			.map(|import| import.id),
	})
}

/// Records a successful plugin run in its own short-lived transaction
pub(super) async fn record_success(
	db: &(impl ConnectionTrait + TransactionTrait),
	scope: Scope,
	name: &str,
	uuid: Uuid,
) -> Result<Recorded, TaskEngineError> {
	let txn = db.begin().await?;

	let id = entity_id(&txn, scope, uuid)
		.await?
		.ok_or(TaskEngineError::EntityNotFound { scope, uuid })?;

	let res = match scope {
		Scope::Artifact => artifact_task::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			name: Set(name.to_owned()),
			artifact_id: Set(id),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(&txn)
		.await
		.map(|_| ()),
		Scope::Import => import_task::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			name: Set(name.to_owned()),
			import_id: Set(id),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(&txn)
		.await
		.map(|_| ()),
	};

	match res {
		Ok(()) => {
			txn.commit().await?;
			trace!(%scope, name, %uuid, "Recorded task");
			Ok(Recorded::Inserted)
		}
		Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
			txn.rollback().await?;
			Ok(Recorded::AlreadyRecorded)
		}
		Err(e) => Err(e.into()),
	}
}

/// Names of the plugins recorded for an entity, oldest first
pub async fn task_records(
	db: &impl ConnectionTrait,
	scope: Scope,
	uuid: Uuid,
) -> Result<Vec<String>, TaskEngineError> {
	let id = entity_id(db, scope, uuid)
		.await?
		.ok_or(TaskEngineError::EntityNotFound { scope, uuid })?;

	Ok(match scope {
		Scope::Artifact => ArtifactTask::find()
			.filter(artifact_task::Column::ArtifactId.eq(id))
			.order_by_asc(artifact_task::Column::Id)
			.all(db)
			.await?
			.into_iter()
			.map(|task| task.name)
			.collect(),
		Scope::Import => ImportTask::find()
			.filter(import_task::Column::ImportId.eq(id))
			.order_by_asc(import_task::Column::Id)
			.all(db)
			.await?
			.into_iter()
			.map(|task| task.name)
			.collect(),
	})
}
