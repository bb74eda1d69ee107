use std::future::Future;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::{AbortOnDropHandle, TaskTracker};

use crate::TaskClass;

/// Spawns `fut` on `tracker`, racing it against `shutdown`.
///
/// Resolves to `None` when shutdown preempted the task.
pub(crate) fn spawn_tracked<F>(tracker: &TaskTracker, shutdown: &CancellationToken, class: TaskClass, name: &str, fut: F) -> JoinHandle<Option<F::Output>>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), task = name, pending = tracker.len(), "worker.spawn");
	let shutdown = shutdown.clone();
	tracker.spawn(async move {
		tokio::select! {
			biased;
			_ = shutdown.cancelled() => None,
			out = fut => Some(out),
		}
	})
}

/// Spawns `fut` as a child task whose panic is contained at the task boundary.
///
/// The child runs on its own task so a panic unwinds there; the tracked parent
/// observes the join error, logs it and hands the panic message to `on_panic`.
/// Shutdown drops the parent, which aborts the child.
pub(crate) fn spawn_contained<F, P>(tracker: &TaskTracker, shutdown: &CancellationToken, class: TaskClass, name: String, fut: F, on_panic: P) -> JoinHandle<Option<()>>
where
	F: Future<Output = ()> + Send + 'static,
	P: FnOnce(String) + Send + 'static,
{
	let label = name.clone();
	spawn_tracked(tracker, shutdown, class, &label, async move {
		let child = AbortOnDropHandle::new(tokio::spawn(fut));
		match child.await {
			Ok(()) => {}
			Err(err) => match panic_message(err) {
				Some(message) => {
					tracing::error!(worker_class = class.as_str(), task = %name, panic = %message, "worker.task.panicked");
					on_panic(message);
				}
				None => tracing::debug!(worker_class = class.as_str(), task = %name, "worker.task.aborted"),
			},
		}
	})
}

/// Panic message of a failed join, or `None` if the child was aborted.
fn panic_message(err: JoinError) -> Option<String> {
	let payload = err.try_into_panic().ok()?;
	match payload.downcast::<String>() {
		Ok(message) => Some(*message),
		Err(payload) => Some(payload.downcast_ref::<&'static str>().map_or_else(|| "non-string panic payload".to_string(), |m| (*m).to_string())),
	}
}
