//! In-process job queue feeding [`TaskPluginEngine::process_scope`]

use crate::config::TasksConfig;

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
	sync::{mpsc, Semaphore},
	task::{JoinError, JoinSet},
	time::timeout,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
	plugin::with_job_permit, Scope, ScopeReport, TaskEngineError, TaskPluginEngine, WorkerError,
};

/// One entity waiting to be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
	pub scope: Scope,
	pub uuid: Uuid,
}

#[derive(Debug, Clone)]
pub struct JobQueue {
	tx: mpsc::Sender<Job>,
}

#[derive(Debug)]
pub struct JobReceiver {
	rx: mpsc::Receiver<Job>,
}

/// Creates a bounded job queue. The worker stops once every [`JobQueue`] handle is dropped and
/// the queued jobs are done.
#[must_use]
pub fn job_queue(capacity: usize) -> (JobQueue, JobReceiver) {
	let (tx, rx) = mpsc::channel(capacity.max(1));
	(JobQueue { tx }, JobReceiver { rx })
}

impl JobQueue {
	/// Waits for room in the queue if it is full
	pub async fn enqueue(&self, scope: Scope, uuid: Uuid) -> Result<(), WorkerError> {
		self.tx
			.send(Job { scope, uuid })
			.await
			.map_err(|_| WorkerError::QueueClosed)?;

		debug!(%scope, %uuid, "Enqueued job");

		Ok(())
	}
}

#[derive(Debug)]
pub enum JobOutcome {
	Processed(ScopeReport),
	TimedOut,
	Failed(TaskEngineError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
	pub processed: usize,
	pub timed_out: usize,
	pub failed: usize,
}

impl WorkerStats {
	fn account(&mut self, res: Result<(Job, JobOutcome), JoinError>) {
		match res {
			Ok((_, JobOutcome::Processed(_))) => self.processed += 1,
			Ok((job, JobOutcome::TimedOut)) => {
				warn!(
					scope = %job.scope,
					uuid = %job.uuid,
					"Job timed out, side effects of finished plugins persist",
				);
				self.timed_out += 1;
			}
			Ok((job, JobOutcome::Failed(e))) => {
				error!(scope = %job.scope, uuid = %job.uuid, "Job failed: {e:#}");
				self.failed += 1;
			}
			Err(e) => {
				error!("Job task failed to complete: {e:#}");
				self.failed += 1;
			}
		}
	}
}

/// Takes jobs off a [`JobReceiver`] and processes up to `max_jobs` of them at once
#[derive(Debug)]
pub struct Worker {
	engine: Arc<TaskPluginEngine>,
	max_jobs: usize,
	job_timeout: Option<Duration>,
}

impl Worker {
	pub fn new(engine: Arc<TaskPluginEngine>, config: &TasksConfig) -> Self {
		Self {
			engine,
			max_jobs: config.max_jobs.max(1),
			job_timeout: config.job_timeout_secs.map(Duration::from_secs),
		}
	}

	/// Runs until the queue is closed and drained, then waits for in-flight jobs
	pub async fn run(self, mut jobs: JobReceiver) -> WorkerStats {
		let permits = Arc::new(Semaphore::new(self.max_jobs));
		let mut running = JoinSet::new();
		let mut stats = WorkerStats::default();

		info!(max_jobs = self.max_jobs, "Task worker started");

		while let Some(job) = jobs.rx.recv().await {
			let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
				// Never closed while we hold it
				break;
			};

			while let Some(res) = running.try_join_next() {
				stats.account(res);
			}

			let engine = Arc::clone(&self.engine);
			let job_timeout = self.job_timeout;

			running.spawn(async move {
				let outcome = with_job_permit(permit, process(&engine, job, job_timeout)).await;
				(job, outcome)
			});
		}

		debug!(in_flight = running.len(), "Job queue closed, draining");

		while let Some(res) = running.join_next().await {
			stats.account(res);
		}

		// Blocking plugins of timed out jobs hold their permits until they finish
		if let Ok(all) = u32::try_from(self.max_jobs) {
			let _idle = permits.acquire_many(all).await;
		}

		info!(?stats, "Task worker stopped");

		stats
	}
}

async fn process(
	engine: &TaskPluginEngine,
	job: Job,
	job_timeout: Option<Duration>,
) -> JobOutcome {
	let fut = engine.process_scope(job.scope, job.uuid);

	let res = match job_timeout {
		Some(limit) => match timeout(limit, fut).await {
			Ok(res) => res,
			Err(_) => return JobOutcome::TimedOut,
		},
		None => fut.await,
	};

	match res {
		Ok(report) => JobOutcome::Processed(report),
		Err(e) => JobOutcome::Failed(e),
	}
}
