//! Running task plugins per entity and recording their successes

mod helpers;

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use helpers::TestStore;
use marmolada_core::{
	infrastructure::tasks::{
		task_records, PluginContext, PluginDescriptor, PluginRegistry, Scope, ScopeReport,
		TaskEngineError, TaskPluginEngine,
	},
	plugins,
};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;
use uuid::Uuid;

type Calls = Arc<Mutex<Vec<String>>>;

fn ctx(test: &TestStore) -> PluginContext {
	PluginContext {
		db: test.conn().clone(),
		files: test.files.clone(),
	}
}

/// A plugin that notes its name in `calls` and then succeeds
fn ok(scope: Scope, name: &'static str, calls: &Calls) -> PluginDescriptor {
	let calls = Arc::clone(calls);
	PluginDescriptor::new(scope.as_str(), name).blocking(move |_, _| {
		calls.lock().unwrap().push(name.to_owned());
		Ok(())
	})
}

fn failing(name: &'static str, calls: &Calls) -> PluginDescriptor {
	let calls = Arc::clone(calls);
	PluginDescriptor::new("artifact", name).future(move |_, uuid| {
		let calls = Arc::clone(&calls);
		async move {
			calls.lock().unwrap().push(name.to_owned());
			Err::<(), _>(anyhow!("{name} can't handle {uuid}"))
		}
	})
}

fn names(names: &[&str]) -> Vec<String> {
	names.iter().map(|name| (*name).to_owned()).collect()
}

#[tokio::test]
async fn test_process_scope_requires_discovery() {
	let test = TestStore::new().await;
	let engine = TaskPluginEngine::new(ctx(&test), PluginRegistry::new());

	assert!(matches!(
		engine.process_scope(Scope::Artifact, Uuid::new_v4()).await,
		Err(TaskEngineError::DiscoveryNotRun)
	));
	assert!(matches!(
		engine.plugin_order(Scope::Artifact),
		Err(TaskEngineError::DiscoveryNotRun)
	));

	engine.discover_plugins();
	// Discovering twice is harmless
	engine.discover_plugins();

	assert_eq!(
		engine
			.process_scope(Scope::Artifact, Uuid::new_v4())
			.await
			.unwrap(),
		ScopeReport::default()
	);
}

#[tokio::test]
#[traced_test]
async fn test_failed_plugin_skips_dependents() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;
	let calls = Calls::default();

	let registry = [
		ok(Scope::Artifact, "test1", &calls),
		failing("test4", &calls),
		ok(Scope::Artifact, "test5", &calls).depends_on("test4"),
		ok(Scope::Artifact, "test6", &calls).depends_on(["test5"]),
		ok(Scope::Artifact, "test3", &calls).depends_on("test1"),
	]
	.into_iter()
	.collect::<PluginRegistry>();

	let engine = TaskPluginEngine::new(ctx(&test), registry);
	engine.discover_plugins();

	assert_eq!(
		engine.plugin_order(Scope::Artifact).unwrap(),
		["test1", "test4", "test5", "test6", "test3"]
	);

	let report = engine
		.process_scope(Scope::Artifact, artifact.uuid)
		.await
		.unwrap();

	assert_eq!(
		report,
		ScopeReport {
			succeeded: names(&["test1", "test3"]),
			failed: names(&["test4"]),
			skipped: names(&["test5", "test6"]),
		}
	);
	assert_eq!(*calls.lock().unwrap(), names(&["test1", "test4", "test3"]));

	assert!(logs_contain("Task plugin raised an error"));
	assert!(logs_contain("Skipping task plugin due to unfulfilled deps: test4"));
	assert!(logs_contain("Skipping task plugin due to unfulfilled deps: test5"));

	assert_eq!(
		task_records(test.conn(), Scope::Artifact, artifact.uuid)
			.await
			.unwrap(),
		["test1", "test3"]
	);
}

#[tokio::test]
async fn test_panicking_plugin_counts_as_failed() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;
	let calls = Calls::default();

	let registry = [
		PluginDescriptor::new("artifact", "panics").blocking(|_, _| panic!("boom")),
		ok(Scope::Artifact, "after-panic", &calls).depends_on("panics"),
		ok(Scope::Artifact, "unrelated", &calls),
	]
	.into_iter()
	.collect::<PluginRegistry>();

	let engine = TaskPluginEngine::new(ctx(&test), registry);
	engine.discover_plugins();

	let report = engine
		.process_scope(Scope::Artifact, artifact.uuid)
		.await
		.unwrap();

	assert_eq!(report.failed, ["panics"]);
	assert_eq!(report.skipped, ["after-panic"]);
	assert_eq!(report.succeeded, ["unrelated"]);
	assert_eq!(*calls.lock().unwrap(), ["unrelated"]);
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_records() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;
	let calls = Calls::default();

	let registry = [ok(Scope::Artifact, "once", &calls)]
		.into_iter()
		.collect::<PluginRegistry>();

	let engine = TaskPluginEngine::new(ctx(&test), registry);
	engine.discover_plugins();

	for _ in 0..2 {
		let report = engine
			.process_scope(Scope::Artifact, artifact.uuid)
			.await
			.unwrap();
		assert_eq!(report.succeeded, ["once"]);
	}

	assert_eq!(calls.lock().unwrap().len(), 2);
	assert_eq!(
		task_records(test.conn(), Scope::Artifact, artifact.uuid)
			.await
			.unwrap(),
		["once"]
	);
}

#[tokio::test]
async fn test_import_scope() {
	let test = TestStore::new().await;
	let import = test.import().await;
	let calls = Calls::default();

	let registry = [
		ok(Scope::Import, "summarize", &calls),
		ok(Scope::Artifact, "artifact-only", &calls),
	]
	.into_iter()
	.collect::<PluginRegistry>();

	let engine = TaskPluginEngine::new(ctx(&test), registry);
	engine.discover_plugins();

	let report = engine.process_scope(Scope::Import, import).await.unwrap();

	assert_eq!(report.succeeded, ["summarize"]);
	assert_eq!(*calls.lock().unwrap(), ["summarize"]);
	assert_eq!(
		task_records(test.conn(), Scope::Import, import).await.unwrap(),
		["summarize"]
	);

	assert!(matches!(
		task_records(test.conn(), Scope::Import, Uuid::new_v4()).await,
		Err(TaskEngineError::EntityNotFound { scope: Scope::Import, .. })
	));
}

#[tokio::test]
async fn test_file_type_plugin_updates_content_type() {
	let test = TestStore::new().await;
	let artifact = test
		.artifact_with_payload(Some("pixel"), b"\x89PNG\r\n\x1A\n\0\0\0\rIHDR")
		.await;
	assert_eq!(artifact.content_type, "image/png");

	// Pretend the content type got lost
	let tx = test.files.begin(test.conn()).await.unwrap();
	test.files
		.set_content_type(&tx, artifact.uuid, "application/octet-stream".to_owned())
		.await
		.unwrap();
	tx.commit().await.unwrap();

	let engine = TaskPluginEngine::new(ctx(&test), PluginRegistry::builtin());
	engine.discover_plugins();

	let report = engine
		.process_scope(Scope::Artifact, artifact.uuid)
		.await
		.unwrap();
	assert_eq!(report.succeeded, [plugins::file_type::NAME]);

	let tx = test.files.begin(test.conn()).await.unwrap();
	assert_eq!(
		test.files
			.get(&tx, artifact.uuid)
			.await
			.unwrap()
			.content_type,
		"image/png"
	);
}

#[tokio::test]
async fn test_file_type_plugin_fails_without_payload() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;

	let engine = TaskPluginEngine::new(ctx(&test), PluginRegistry::builtin());
	engine.discover_plugins();

	let report = engine
		.process_scope(Scope::Artifact, artifact.uuid)
		.await
		.unwrap();

	assert_eq!(report.failed, [plugins::file_type::NAME]);
	assert!(task_records(test.conn(), Scope::Artifact, artifact.uuid)
		.await
		.unwrap()
		.is_empty());
}
