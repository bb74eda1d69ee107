use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::TaskClass;
use crate::registry::WorkerRegistry;
use crate::spawn::{spawn_contained, spawn_tracked};

/// Shutdown mode for [`WorkerRuntime::shutdown`].
#[derive(Debug, Clone, Copy)]
pub enum ShutdownMode {
	/// Cancel every tracked task, then wait for them to unwind.
	Immediate,
	/// Wait up to `timeout` for tracked tasks to finish on their own.
	Graceful { timeout: Duration },
}

/// Outcome of one shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
	completed: bool,
	timed_out: bool,
	abandoned: usize,
}

impl ShutdownReport {
	/// Whether all tracked tasks have exited.
	pub fn completed(&self) -> bool {
		self.completed
	}

	pub fn timed_out(&self) -> bool {
		self.timed_out
	}

	/// Tasks still running when shutdown switched to cancellation.
	pub fn abandoned(&self) -> usize {
		self.abandoned
	}
}

/// Runtime entrypoint for tracked background work.
///
/// Clones share the same tracker, shutdown token and registry.
#[derive(Debug, Clone, Default)]
pub struct WorkerRuntime {
	tracker: TaskTracker,
	shutdown: CancellationToken,
	registry: WorkerRegistry,
}

impl WorkerRuntime {
	pub fn new() -> Self {
		Self::default()
	}

	/// Spawns a tracked task. Resolves to `None` if shutdown preempted it.
	pub fn spawn<F>(&self, class: TaskClass, name: &str, fut: F) -> JoinHandle<Option<F::Output>>
	where
		F: Future + Send + 'static,
		F::Output: Send + 'static,
	{
		spawn_tracked(&self.tracker, &self.shutdown, class, name, fut)
	}

	/// Spawns a tracked task whose panic is logged and reported to `on_panic`
	/// instead of propagating to the awaiting side.
	pub fn spawn_contained<F, P>(&self, class: TaskClass, name: impl Into<String>, fut: F, on_panic: P) -> JoinHandle<Option<()>>
	where
		F: Future<Output = ()> + Send + 'static,
		P: FnOnce(String) + Send + 'static,
	{
		spawn_contained(&self.tracker, &self.shutdown, class, name.into(), fut, on_panic)
	}

	/// Number of tracked tasks still alive.
	pub fn pending(&self) -> usize {
		self.tracker.len()
	}

	pub fn registry(&self) -> &WorkerRegistry {
		&self.registry
	}

	/// Shuts down tracked work.
	///
	/// Tasks spawned after this call observe the cancelled token immediately
	/// once shutdown has escalated to cancellation.
	pub async fn shutdown(&self, mode: ShutdownMode) -> ShutdownReport {
		self.tracker.close();
		match mode {
			ShutdownMode::Immediate => {
				let abandoned = self.tracker.len();
				self.shutdown.cancel();
				self.tracker.wait().await;
				ShutdownReport {
					completed: true,
					timed_out: false,
					abandoned,
				}
			}
			ShutdownMode::Graceful { timeout } => {
				let completed = tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok();
				ShutdownReport {
					completed,
					timed_out: !completed,
					abandoned: if completed { 0 } else { self.tracker.len() },
				}
			}
		}
	}

	/// Two-phase shutdown: tries graceful first, forces immediate on timeout.
	pub async fn shutdown_graceful_or_force(&self, timeout: Duration) -> ShutdownReport {
		let report = self.shutdown(ShutdownMode::Graceful { timeout }).await;
		if report.timed_out() {
			tracing::warn!(pending = report.abandoned(), "graceful worker shutdown timed out; forcing immediate");
			let forced = self.shutdown(ShutdownMode::Immediate).await;
			return ShutdownReport {
				completed: forced.completed(),
				timed_out: true,
				abandoned: report.abandoned(),
			};
		}
		report
	}
}
