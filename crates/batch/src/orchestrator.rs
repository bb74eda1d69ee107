//! Facade over planning, sequencing, readiness and batch runners.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use troupe_worker::{IdClock, ScopedToken, ShutdownReport, TaskClass, WorkerRecord, WorkerRegistry, WorkerRuntime};

use crate::config::CoreConfig;
use crate::error::ValidationError;
use crate::geometry::{BatchDescriptor, InitDescriptor, Shape};
use crate::host::{InvocationContext, ReplyKind, Requester, ServerHost};
use crate::readiness::{Readiness, Signal};
use crate::runner::{BatchOutcome, BatchReport, BatchRunner, FollowUps, LifecycleStep};
use crate::sequencer::{render, sequence, spawns_actors};
use crate::types::{ActorId, BatchId};

/// Who asked for a batch, and where replies go.
#[derive(Clone)]
pub struct Invocation {
	pub context: InvocationContext,
	pub requester: Arc<dyn Requester>,
}

impl Invocation {
	pub fn new(context: InvocationContext, requester: Arc<dyn Requester>) -> Self {
		Self { context, requester }
	}
}

/// Handle to a batch running in the background.
#[derive(Debug)]
pub struct BatchHandle {
	id: BatchId,
	report: oneshot::Receiver<BatchReport>,
}

impl BatchHandle {
	pub const fn id(&self) -> BatchId {
		self.id
	}

	/// Waits for the final report.
	///
	/// `None` if the batch panicked or was aborted by a forced shutdown.
	pub async fn report(self) -> Option<BatchReport> {
		self.report.await.ok()
	}
}

/// What one stop request did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopSummary {
	/// Batches whose token this request cancelled.
	pub batches: usize,
	/// Pending entries dropped from the table.
	pub cleared: usize,
}

type LiveBatches = Arc<Mutex<BTreeMap<BatchId, ScopedToken>>>;

/// Unregisters a batch when its task ends, including by panic or abort.
struct LiveGuard {
	id: BatchId,
	live: LiveBatches,
	registry: WorkerRegistry,
}

impl Drop for LiveGuard {
	fn drop(&mut self) {
		self.live.lock().remove(&self.id);
		self.registry.remove(self.id.0);
	}
}

/// Entry point of the batch core.
pub struct Orchestrator {
	config: CoreConfig,
	runtime: WorkerRuntime,
	readiness: Readiness,
	ids: IdClock,
	live: LiveBatches,
}

impl Orchestrator {
	/// Creates the orchestrator and starts the readiness poll loop.
	///
	/// Must be called from within a tokio runtime.
	pub fn new(host: Arc<dyn ServerHost>, config: CoreConfig) -> Self {
		let runtime = WorkerRuntime::new();
		let readiness = Readiness::new(host, runtime.clone(), config.readiness);
		readiness.spawn_poll_loop();
		tracing::debug!(base = %config.base_name, interval_ms = config.interval.as_millis() as u64, "orchestrator.start");
		Self {
			config,
			runtime,
			readiness,
			ids: IdClock::new(),
			live: LiveBatches::default(),
		}
	}

	pub fn run_range_batch(&self, desc: BatchDescriptor, invocation: Invocation) -> Result<BatchHandle, ValidationError> {
		expect_shape(&desc, "range")?;
		Ok(self.run_batch(desc, invocation))
	}

	pub fn run_line_batch(&self, desc: BatchDescriptor, invocation: Invocation) -> Result<BatchHandle, ValidationError> {
		expect_shape(&desc, "line")?;
		Ok(self.run_batch(desc, invocation))
	}

	/// Runs a grid batch. A grid the actor count does not fill is warned
	/// about, then planned with a partial last row.
	pub fn run_grid_batch(&self, desc: BatchDescriptor, invocation: Invocation) -> Result<BatchHandle, ValidationError> {
		expect_shape(&desc, "grid")?;
		if let (Some(shortfall), Shape::Grid { width, .. }) = (desc.grid_shortfall(), desc.shape()) {
			let label = desc.label(&self.config.base_name);
			invocation.requester.reply(
				ReplyKind::Warning,
				&format!("{} actors do not fill a {width}-wide grid; the last row of {label} is {shortfall} short", desc.count()),
			);
		}
		Ok(self.run_batch(desc, invocation))
	}

	/// Runs spawn, act and kill for each actor of `desc`, one after another.
	pub fn run_init_sequence(&self, desc: InitDescriptor, invocation: Invocation) -> Result<BatchHandle, ValidationError> {
		let base = &self.config.base_name;
		let style = self.config.placement;
		let context = invocation.context.clone();
		let action = desc.action().to_string();
		let lifecycles = desc.actors(base).map(move |(index, actor)| LifecycleStep {
			spawn: render(&context, &actor, "spawn", None, style),
			follow_ups: vec![render(&context, &actor, &action, None, style)],
			kill: render(&context, &actor, "kill", None, style),
			actor,
			index,
		});
		let label = desc.label(base);
		let success = format!("init sequence {label} finished");
		let (act, between) = (desc.act(), desc.between());
		Ok(self.launch(label, desc.length(), invocation, success, move |runner| runner.run_init(lifecycles, act, between)))
	}

	fn run_batch(&self, desc: BatchDescriptor, invocation: Invocation) -> BatchHandle {
		let base = &self.config.base_name;
		let label = desc.label(base);
		let steps = sequence(desc.plan(base), invocation.context.clone(), desc.action(), self.config.placement);
		let pacing = spawns_actors(desc.action()).then_some(self.config.interval);
		let follow_ups = (!desc.follow_ups().is_empty()).then(|| FollowUps {
			context: invocation.context.clone(),
			actions: desc.follow_ups().to_vec(),
		});
		let success = match desc.shape() {
			Shape::Point => format!("operated {label} with `{}`", desc.action()),
			Shape::Line { direction } => format!("spawned line {label} towards {direction}, spacing {}", desc.spacing()),
			Shape::Grid { rows, columns, .. } => format!("spawned grid {label} along {rows}×{columns}, spacing {}", desc.spacing()),
		};
		self.launch(label, desc.count(), invocation, success, move |runner| runner.run_sequence(steps, follow_ups, pacing))
	}

	fn launch<W, Fut>(&self, label: String, total: usize, invocation: Invocation, success: String, work: W) -> BatchHandle
	where
		W: FnOnce(BatchRunner) -> Fut,
		Fut: Future<Output = BatchReport> + Send + 'static,
	{
		let id = BatchId(self.ids.next());
		let token = ScopedToken::detached(id.0);
		let registry = self.runtime.registry().clone();
		self.live.lock().insert(id, token.clone());
		registry.upsert(WorkerRecord {
			id: id.0,
			label: label.clone(),
			class: TaskClass::Batch,
			completed: 0,
			total,
		});
		let guard = LiveGuard {
			id,
			live: Arc::clone(&self.live),
			registry: registry.clone(),
		};
		tracing::info!(batch = %id, %label, total, "batch.start");

		let run = work(BatchRunner {
			id,
			label,
			readiness: self.readiness.clone(),
			token,
			registry,
			reject_collisions: self.config.reject_collisions,
		});
		let (tx, rx) = oneshot::channel();
		let requester = Arc::clone(&invocation.requester);
		let on_panic = invocation.requester;
		self.runtime.spawn_contained(
			TaskClass::Batch,
			format!("batch {id}"),
			async move {
				let report = run.await;
				drop(guard);
				let (kind, message) = outcome_reply(&report, &success);
				requester.reply(kind, &message);
				let _ = tx.send(report);
			},
			move |_| on_panic.reply(ReplyKind::Error, "batch failed unexpectedly, see the server log"),
		);
		BatchHandle { id, report: rx }
	}

	/// Stops every running batch and drops all pending follow-ups.
	///
	/// Idempotent; follow-ups already firing still complete.
	pub fn request_stop(&self) -> StopSummary {
		let tokens: Vec<ScopedToken> = self.live.lock().values().cloned().collect();
		let batches = tokens.iter().filter(|token| token.cancel()).count();
		let cleared = self.readiness.table().clear();
		tracing::info!(batches, cleared, "batch.stop");
		StopSummary { batches, cleared }
	}

	/// Stops one batch and drops only its pending follow-ups.
	///
	/// `None` if no such batch is running.
	pub fn request_stop_batch(&self, id: BatchId) -> Option<StopSummary> {
		let token = self.live.lock().get(&id).cloned()?;
		let batches = usize::from(token.cancel());
		let cleared = self.readiness.table().clear_batch(id);
		tracing::info!(batch = %id, cleared, "batch.stop");
		Some(StopSummary { batches, cleared })
	}

	/// Push notification that `name` is now online.
	///
	/// Returns whether this notification fired pending follow-ups.
	pub fn actor_joined(&self, name: &str) -> bool {
		self.readiness.reconcile(name, Signal::Joined)
	}

	/// Runs one readiness poll now. Returns how many actors it fired.
	pub fn poll_readiness(&self) -> usize {
		self.readiness.poll_once()
	}

	/// Progress of running batches, by id.
	pub fn active_batches(&self) -> Vec<WorkerRecord> {
		self.runtime.registry().snapshots()
	}

	pub fn pending_actors(&self) -> Vec<ActorId> {
		self.readiness.table().pending_actors()
	}

	/// Stops all batches, then waits up to `timeout` for background work
	/// before cancelling what remains.
	pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
		let stopped = self.request_stop();
		self.readiness.halt();
		let report = self.runtime.shutdown_graceful_or_force(timeout).await;
		tracing::info!(batches = stopped.batches, completed = report.completed(), abandoned = report.abandoned(), "orchestrator.shutdown");
		report
	}
}

impl Drop for Orchestrator {
	fn drop(&mut self) {
		self.readiness.halt();
	}
}

fn expect_shape(desc: &BatchDescriptor, expected: &'static str) -> Result<(), ValidationError> {
	let found = desc.shape().kind();
	if found == expected {
		Ok(())
	} else {
		Err(ValidationError::ShapeMismatch { expected, found })
	}
}

fn outcome_reply(report: &BatchReport, success: &str) -> (ReplyKind, String) {
	let label = &report.label;
	match report.outcome {
		BatchOutcome::Stopped { last_completed: Some(index) } => (ReplyKind::Warning, format!("batch {label} stopped; last completed index {index}")),
		BatchOutcome::Stopped { last_completed: None } => (ReplyKind::Warning, format!("batch {label} stopped before any actor completed")),
		BatchOutcome::Completed if report.is_failure() => (ReplyKind::Error, format!("batch {label} finished with {} failed commands, see the server log", report.failed)),
		BatchOutcome::Completed => (ReplyKind::Info, success.to_string()),
	}
}

#[cfg(test)]
mod tests;
