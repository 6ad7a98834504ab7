use crate::operations::artifacts::ArtifactFileStore;

use std::{any::Any, fmt, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use sea_orm::DatabaseConnection;
use tokio::{sync::OwnedSemaphorePermit, task::JoinError};
use tokio_util::task::AbortOnDropHandle;
use uuid::Uuid;

tokio::task_local! {
	/// The worker permit of the job currently being processed
	static JOB_PERMIT: Arc<OwnedSemaphorePermit>;
}

/// Runs `fut` as a job holding `permit`. Blocking plugins started by it keep the permit until
/// their thread is done, even when `fut` is dropped early.
pub(super) async fn with_job_permit<F>(permit: OwnedSemaphorePermit, fut: F) -> F::Output
where
	F: Future,
{
	JOB_PERMIT.scope(Arc::new(permit), fut).await
}

/// What a plugin gets to work with besides the entity uuid
#[derive(Debug, Clone)]
pub struct PluginContext {
	pub db: DatabaseConnection,
	pub files: ArtifactFileStore,
}

type BlockingProcessFn = dyn Fn(PluginContext, Uuid) -> anyhow::Result<()> + Send + Sync;
type AsyncProcessFn =
	dyn Fn(PluginContext, Uuid) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// The work a plugin does for one entity
#[derive(Clone)]
pub enum PluginProcess {
	/// Runs on tokio's blocking thread pool
	Blocking(Arc<BlockingProcessFn>),
	/// Runs as its own tokio task
	Async(Arc<AsyncProcessFn>),
}

impl PluginProcess {
	pub fn blocking<F>(f: F) -> Self
	where
		F: Fn(PluginContext, Uuid) -> anyhow::Result<()> + Send + Sync + 'static,
	{
		Self::Blocking(Arc::new(f))
	}

	pub fn future<F, Fut>(f: F) -> Self
	where
		F: Fn(PluginContext, Uuid) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		Self::Async(Arc::new(move |ctx: PluginContext, uuid: Uuid| {
			f(ctx, uuid).boxed()
		}))
	}

	/// Runs the plugin to completion. Panics are caught by tokio and reported as errors.
	///
	/// Dropping the returned future aborts an async plugin. A blocking plugin can't be stopped,
	/// its thread runs to completion and holds on to the job's worker permit until then.
	pub(super) async fn run(&self, ctx: PluginContext, uuid: Uuid) -> anyhow::Result<()> {
		let res = match self {
			Self::Blocking(f) => {
				let f = Arc::clone(f);
				let permit = JOB_PERMIT.try_with(Arc::clone).ok();

				tokio::task::spawn_blocking(move || {
					let _permit = permit;
					f(ctx, uuid)
				})
				.await
			}
			Self::Async(f) => AbortOnDropHandle::new(tokio::spawn(f(ctx, uuid))).await,
		};

		res.map_err(join_error)?
	}
}

impl fmt::Debug for PluginProcess {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Blocking(_) => "PluginProcess::Blocking(..)",
			Self::Async(_) => "PluginProcess::Async(..)",
		})
	}
}

fn join_error(e: JoinError) -> anyhow::Error {
	if !e.is_panic() {
		return anyhow::anyhow!("plugin task was cancelled");
	}

	let payload = e.into_panic();
	anyhow::anyhow!("plugin panicked: {}", panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("<non-string panic payload>")
}

/// Names of the plugins (of the same scope) that have to succeed first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependencies {
	One(String),
	Many(Vec<String>),
}

impl Dependencies {
	pub fn names(&self) -> impl Iterator<Item = &str> {
		let names: &[String] = match self {
			Self::One(name) => std::slice::from_ref(name),
			Self::Many(names) => names,
		};

		names.iter().map(String::as_str)
	}
}

impl From<&str> for Dependencies {
	fn from(name: &str) -> Self {
		Self::One(name.to_owned())
	}
}

impl From<String> for Dependencies {
	fn from(name: String) -> Self {
		Self::One(name)
	}
}

impl<const N: usize> From<[&str; N]> for Dependencies {
	fn from(names: [&str; N]) -> Self {
		Self::Many(names.into_iter().map(ToOwned::to_owned).collect())
	}
}

impl From<Vec<String>> for Dependencies {
	fn from(names: Vec<String>) -> Self {
		Self::Many(names)
	}
}

/// A plugin as registered, before validation.
///
/// `scope` and `process` are checked during discovery, descriptors that fail are logged and
/// dropped.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
	pub scope: String,
	pub name: String,
	pub dependencies: Option<Dependencies>,
	pub process: Option<PluginProcess>,
}

impl PluginDescriptor {
	pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			scope: scope.into(),
			name: name.into(),
			dependencies: None,
			process: None,
		}
	}

	#[must_use]
	pub fn depends_on(mut self, dependencies: impl Into<Dependencies>) -> Self {
		self.dependencies = Some(dependencies.into());
		self
	}

	#[must_use]
	pub fn with_process(mut self, process: PluginProcess) -> Self {
		self.process = Some(process);
		self
	}

	#[must_use]
	pub fn blocking<F>(self, f: F) -> Self
	where
		F: Fn(PluginContext, Uuid) -> anyhow::Result<()> + Send + Sync + 'static,
	{
		self.with_process(PluginProcess::blocking(f))
	}

	#[must_use]
	pub fn future<F, Fut>(self, f: F) -> Self
	where
		F: Fn(PluginContext, Uuid) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		self.with_process(PluginProcess::future(f))
	}
}

/// The statically assembled list of plugins an engine discovers, in registration order
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
	descriptors: Vec<PluginDescriptor>,
}

impl PluginRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding the plugins shipped with the core
	#[must_use]
	pub fn builtin() -> Self {
		let mut registry = Self::new();
		for descriptor in crate::plugins::builtin() {
			registry.register(descriptor);
		}
		registry
	}

	pub fn register(&mut self, descriptor: PluginDescriptor) -> &mut Self {
		self.descriptors.push(descriptor);
		self
	}

	#[must_use]
	pub fn descriptors(&self) -> &[PluginDescriptor] {
		&self.descriptors
	}
}

impl FromIterator<PluginDescriptor> for PluginRegistry {
	fn from_iter<T: IntoIterator<Item = PluginDescriptor>>(iter: T) -> Self {
		Self {
			descriptors: iter.into_iter().collect(),
		}
	}
}
