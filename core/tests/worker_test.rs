//! The in-process job queue and its worker

mod helpers;

use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use helpers::TestStore;
use marmolada_core::{
	config::TasksConfig,
	infrastructure::tasks::{
		job_queue, PluginContext, PluginDescriptor, PluginRegistry, Scope, TaskPluginEngine,
		Worker, WorkerError, WorkerStats,
	},
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Gauge {
	current: AtomicUsize,
	peak: AtomicUsize,
	done: AtomicUsize,
}

/// An artifact plugin that takes `delay` and tracks how many of its runs overlap
fn slow_plugin(delay: Duration, gauge: &Arc<Gauge>) -> PluginDescriptor {
	let gauge = Arc::clone(gauge);
	PluginDescriptor::new("artifact", "slow").future(move |_, _| {
		let gauge = Arc::clone(&gauge);
		async move {
			let running = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
			gauge.peak.fetch_max(running, Ordering::SeqCst);

			tokio::time::sleep(delay).await;

			gauge.current.fetch_sub(1, Ordering::SeqCst);
			gauge.done.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	})
}

fn engine(test: &TestStore, registry: PluginRegistry) -> Arc<TaskPluginEngine> {
	Arc::new(TaskPluginEngine::new(
		PluginContext {
			db: test.conn().clone(),
			files: test.files.clone(),
		},
		registry,
	))
}

fn tasks_config(max_jobs: usize, job_timeout_secs: Option<u64>) -> TasksConfig {
	TasksConfig {
		max_jobs,
		job_timeout_secs,
		..Default::default()
	}
}

#[tokio::test]
async fn test_jobs_run_concurrently_up_to_max_jobs() {
	let test = TestStore::new().await;
	let gauge = Arc::new(Gauge::default());

	let engine = engine(
		&test,
		[slow_plugin(Duration::from_millis(200), &gauge)]
			.into_iter()
			.collect(),
	);
	engine.discover_plugins();

	let (queue, jobs) = job_queue(16);
	for _ in 0..4 {
		let artifact = test.artifact(None).await;
		queue.enqueue(Scope::Artifact, artifact.uuid).await.unwrap();
	}
	// Closing the queue lets the worker finish once everything queued is done
	drop(queue);

	let stats = Worker::new(engine, &tasks_config(2, None)).run(jobs).await;

	assert_eq!(
		stats,
		WorkerStats {
			processed: 4,
			timed_out: 0,
			failed: 0,
		}
	);
	assert_eq!(gauge.done.load(Ordering::SeqCst), 4);
	assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timed_out_jobs_are_counted() {
	let test = TestStore::new().await;
	let gauge = Arc::new(Gauge::default());

	let engine = engine(
		&test,
		[slow_plugin(Duration::from_millis(1500), &gauge)]
			.into_iter()
			.collect(),
	);
	engine.discover_plugins();

	let artifact = test.artifact(None).await;

	let (queue, jobs) = job_queue(1);
	queue.enqueue(Scope::Artifact, artifact.uuid).await.unwrap();
	drop(queue);

	let stats = Worker::new(engine, &tasks_config(1, Some(1))).run(jobs).await;

	assert_eq!(stats.timed_out, 1);
	assert_eq!(stats.processed, 0);

	// The plugin got aborted, it does not finish in the background
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(gauge.current.load(Ordering::SeqCst), 1);
	assert_eq!(gauge.done.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timed_out_blocking_plugins_keep_their_slot() {
	let test = TestStore::new().await;
	let gauge = Arc::new(Gauge::default());

	let plugin = {
		let gauge = Arc::clone(&gauge);
		PluginDescriptor::new("artifact", "slow-blocking").blocking(move |_, _| {
			let running = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
			gauge.peak.fetch_max(running, Ordering::SeqCst);

			std::thread::sleep(Duration::from_millis(1500));

			gauge.current.fetch_sub(1, Ordering::SeqCst);
			gauge.done.fetch_add(1, Ordering::SeqCst);
			Ok(())
		})
	};

	let engine = engine(&test, [plugin].into_iter().collect());
	engine.discover_plugins();

	let (queue, jobs) = job_queue(4);
	for _ in 0..2 {
		let artifact = test.artifact(None).await;
		queue.enqueue(Scope::Artifact, artifact.uuid).await.unwrap();
	}
	drop(queue);

	let stats = Worker::new(engine, &tasks_config(1, Some(1))).run(jobs).await;

	assert_eq!(stats.timed_out, 2);
	// The second job waited for the first thread even though its job timed out
	assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
	// And the worker waited for both threads before stopping
	assert_eq!(gauge.done.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_engine_errors_count_as_failed() {
	let test = TestStore::new().await;

	// Discovery never ran
	let engine = engine(&test, PluginRegistry::new());

	let (queue, jobs) = job_queue(4);
	queue.enqueue(Scope::Import, Uuid::new_v4()).await.unwrap();
	queue.enqueue(Scope::Artifact, Uuid::new_v4()).await.unwrap();
	drop(queue);

	let stats = Worker::new(engine, &tasks_config(4, None)).run(jobs).await;

	assert_eq!(stats.failed, 2);
	assert_eq!(stats.processed, 0);
}

#[tokio::test]
async fn test_enqueue_after_worker_stopped() {
	let (queue, jobs) = job_queue(1);
	drop(jobs);

	assert!(matches!(
		queue.enqueue(Scope::Artifact, Uuid::new_v4()).await,
		Err(WorkerError::QueueClosed)
	));
}
