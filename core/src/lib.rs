//! Media-object store core: a DAG of labelled tags, artifact payloads kept in step with database
//! transactions, and task plugins post-processing artifacts and imports.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use crate::{
	config::AppConfig,
	infrastructure::{
		database::Database,
		tasks::{
			job_queue, JobQueue, JobReceiver, PluginContext, PluginRegistry, TaskPluginEngine, Worker,
		},
	},
	operations::artifacts::ArtifactFileStore,
};

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

pub mod config;
pub mod infrastructure;
pub mod operations;
pub mod plugins;

/// Everything a request or worker process needs, wired from one [`AppConfig`]
#[derive(Debug, Clone)]
pub struct Core {
	pub config: AppConfig,
	pub db: Database,
	pub files: ArtifactFileStore,
	pub tasks: Arc<TaskPluginEngine>,
}

impl Core {
	/// Sets up the core with the built-in task plugins
	pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
		Self::with_plugins(config, PluginRegistry::builtin()).await
	}

	/// Connects and migrates the database, prepares the artifacts root and discovers the plugins
	/// of `registry`
	pub async fn with_plugins(config: AppConfig, registry: PluginRegistry) -> anyhow::Result<Self> {
		config.ensure_directories()?;

		let db = Database::connect(&config.database_url())
			.await
			.context("failed to connect to database")?;
		db.migrate().await.context("failed to migrate database")?;

		let files = ArtifactFileStore::new(config.artifacts_root());

		let tasks = Arc::new(TaskPluginEngine::new(
			PluginContext {
				db: db.conn().clone(),
				files: files.clone(),
			},
			registry,
		));
		tasks.discover_plugins();

		info!(
			data_dir = %config.data_dir.display(),
			artifacts = %files.root().display(),
			"Core initialized",
		);

		Ok(Self {
			config,
			db,
			files,
			tasks,
		})
	}

	/// A job queue sized after the tasks configuration
	#[must_use]
	pub fn job_queue(&self) -> (JobQueue, JobReceiver) {
		job_queue(self.config.tasks.queue_capacity)
	}

	#[must_use]
	pub fn worker(&self) -> Worker {
		Worker::new(Arc::clone(&self.tasks), &self.config.tasks)
	}
}
