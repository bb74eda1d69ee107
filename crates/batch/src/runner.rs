//! Serial execution of one batch on a background task.
//!
//! The runner owns the batch's [`ScopedToken`] and checks it at every step
//! boundary: before each pacing sleep and before each command. A sleep already
//! in progress runs to completion; the stop takes effect at the next boundary.

use std::time::Duration;

use troupe_worker::{ScopedToken, WorkerRegistry};

use crate::host::InvocationContext;
use crate::pending::{Collision, Registration};
use crate::readiness::Readiness;
use crate::sequencer::{Step, follow_up_commands};
use crate::types::{ActorId, BatchId};

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
	/// Every step ran (some may have failed, see [`BatchReport::failed`]).
	Completed,
	/// A stop request ended the batch early.
	Stopped {
		/// Index of the last step that fully finished, if any did.
		last_completed: Option<i64>,
	},
}

/// Final account of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
	pub id: BatchId,
	pub label: String,
	/// Steps the batch was planned with.
	pub total: usize,
	/// Commands the host accepted.
	pub issued: usize,
	/// Commands the host rejected, plus steps skipped on a collision.
	pub failed: usize,
	pub outcome: BatchOutcome,
}

impl BatchReport {
	pub fn is_failure(&self) -> bool {
		self.failed > 0
	}

	pub fn is_stopped(&self) -> bool {
		matches!(self.outcome, BatchOutcome::Stopped { .. })
	}
}

/// Follow-up actions registered for every actor a sequence spawns.
#[derive(Debug, Clone)]
pub(crate) struct FollowUps {
	pub context: InvocationContext,
	pub actions: Vec<String>,
}

/// One actor of an init sequence, fully rendered.
#[derive(Debug, Clone)]
pub(crate) struct LifecycleStep {
	pub actor: ActorId,
	pub index: i64,
	pub spawn: String,
	pub follow_ups: Vec<String>,
	pub kill: String,
}

#[derive(Default)]
struct Tally {
	issued: usize,
	failed: usize,
	last_completed: Option<i64>,
}

pub(crate) struct BatchRunner {
	pub id: BatchId,
	pub label: String,
	pub readiness: Readiness,
	pub token: ScopedToken,
	pub registry: WorkerRegistry,
	pub reject_collisions: bool,
}

impl BatchRunner {
	/// Issues `steps` in order.
	///
	/// With `follow_ups`, each actor's follow-ups are registered before its
	/// command is issued. `pacing` is slept between commands, never before
	/// the first; an unpaced batch yields to the scheduler between commands
	/// instead.
	pub async fn run_sequence<I>(self, steps: I, follow_ups: Option<FollowUps>, pacing: Option<Duration>) -> BatchReport
	where
		I: IntoIterator<Item = Step>,
		I::IntoIter: ExactSizeIterator,
	{
		let steps = steps.into_iter();
		let total = steps.len();
		let pacing = pacing.filter(|p| !p.is_zero());
		let follow_ups = follow_ups.filter(|f| !f.actions.is_empty());
		let mut tally = Tally::default();

		for (n, step) in steps.enumerate() {
			if n > 0 {
				if self.token.is_cancelled() {
					return self.stopped(total, tally);
				}
				match pacing {
					Some(pause) => tokio::time::sleep(pause).await,
					None => tokio::task::yield_now().await,
				}
			}
			if self.token.is_cancelled() {
				return self.stopped(total, tally);
			}

			let registration = match &follow_ups {
				Some(follow_ups) => {
					let commands = follow_up_commands(&follow_ups.context, &step.actor, &follow_ups.actions);
					match self.register(&step.actor, commands) {
						Ok(registration) => Some(registration),
						Err(collision) => {
							self.collided(&collision);
							tally.failed += 1;
							self.finish_step(&mut tally, step.index);
							continue;
						}
					}
				}
				None => None,
			};

			if self.execute(&step.command, &step.actor, &mut tally) {
				tracing::debug!(batch = %self.id, actor = %step.actor, index = step.index, "batch.step");
			} else if let Some(registration) = registration {
				self.readiness.withdraw(&step.actor, registration.generation());
			}
			self.finish_step(&mut tally, step.index);
		}
		self.completed(total, tally)
	}

	/// Runs spawn, readiness, act and kill for each actor, strictly one after
	/// another, `between` apart.
	pub async fn run_init<I>(self, lifecycles: I, act: Duration, between: Duration) -> BatchReport
	where
		I: IntoIterator<Item = LifecycleStep>,
		I::IntoIter: ExactSizeIterator,
	{
		let lifecycles = lifecycles.into_iter();
		let total = lifecycles.len();
		let mut tally = Tally::default();

		for (n, life) in lifecycles.enumerate() {
			if n > 0 {
				if self.token.is_cancelled() {
					return self.stopped(total, tally);
				}
				tokio::time::sleep(between).await;
			}
			if self.token.is_cancelled() {
				return self.stopped(total, tally);
			}

			let registration = match self.register(&life.actor, life.follow_ups) {
				Ok(registration) => registration,
				Err(collision) => {
					self.collided(&collision);
					tally.failed += 1;
					self.finish_step(&mut tally, life.index);
					continue;
				}
			};
			if !self.execute(&life.spawn, &life.actor, &mut tally) {
				self.readiness.withdraw(&life.actor, registration.generation());
				self.finish_step(&mut tally, life.index);
				continue;
			}

			let resolution = registration.resolved().await;
			tracing::debug!(batch = %self.id, actor = %life.actor, ?resolution, "batch.init.resolved");

			if self.token.is_cancelled() {
				return self.stopped(total, tally);
			}
			tokio::time::sleep(act).await;
			if self.token.is_cancelled() {
				return self.stopped(total, tally);
			}
			self.execute(&life.kill, &life.actor, &mut tally);
			self.finish_step(&mut tally, life.index);
		}
		self.completed(total, tally)
	}

	fn register(&self, actor: &ActorId, commands: Vec<String>) -> Result<Registration, Collision> {
		self.readiness.register(actor.clone(), self.id, commands, self.reject_collisions)
	}

	fn collided(&self, collision: &Collision) {
		tracing::warn!(batch = %self.id, actor = %collision.actor, owner = %collision.owner, "batch.step.collision");
	}

	/// Submits one command; a rejection is logged and counted, never fatal.
	fn execute(&self, command: &str, actor: &ActorId, tally: &mut Tally) -> bool {
		match self.readiness.host.execute(command) {
			Ok(()) => {
				tally.issued += 1;
				true
			}
			Err(err) => {
				tracing::warn!(batch = %self.id, %actor, command, error = %err, "batch.step.failed");
				tally.failed += 1;
				false
			}
		}
	}

	fn finish_step(&self, tally: &mut Tally, index: i64) {
		tally.last_completed = Some(index);
		self.registry.advance(self.id.0);
	}

	fn stopped(&self, total: usize, tally: Tally) -> BatchReport {
		tracing::info!(batch = %self.id, last_completed = ?tally.last_completed, "batch.stopped");
		self.report(total, tally.issued, tally.failed, BatchOutcome::Stopped {
			last_completed: tally.last_completed,
		})
	}

	fn completed(&self, total: usize, tally: Tally) -> BatchReport {
		tracing::info!(batch = %self.id, issued = tally.issued, failed = tally.failed, "batch.completed");
		self.report(total, tally.issued, tally.failed, BatchOutcome::Completed)
	}

	fn report(&self, total: usize, issued: usize, failed: usize, outcome: BatchOutcome) -> BatchReport {
		BatchReport {
			id: self.id,
			label: self.label.clone(),
			total,
			issued,
			failed,
			outcome,
		}
	}
}
