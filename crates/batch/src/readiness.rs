//! Readiness reconciliation: matching "actor is online" signals to pending
//! follow-ups.
//!
//! Push notifications ([`Signal::Joined`]) and the poll fallback
//! ([`Signal::Polled`]) both funnel into [`Readiness::reconcile`], which claims
//! the entry under the table lock. Only the caller that wins the claim fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use troupe_worker::{ScopedToken, TaskClass, WorkerRuntime};

use crate::host::ServerHost;
use crate::pending::{Claim, Collision, PendingTable, Registration};
use crate::types::{ActorId, BatchId};

/// Timings of the readiness machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessConfig {
	/// Window after registration before an entry is dropped unfired.
	pub timeout: Duration,
	/// Delay between winning a claim and submitting the first follow-up.
	pub settle: Duration,
	/// Delay between successive follow-ups of one actor.
	pub action_gap: Duration,
	/// Poll period for the online-actor fallback; `None` disables polling.
	pub poll_interval: Option<Duration>,
}

impl Default for ReadinessConfig {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(10),
			settle: Duration::from_millis(500),
			action_gap: Duration::from_millis(200),
			poll_interval: Some(Duration::from_secs(1)),
		}
	}
}

/// Source of a readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
	/// The host pushed a join notification.
	Joined,
	/// A poll of the online-actor list contained the actor.
	Polled,
}

impl Signal {
	const fn as_str(self) -> &'static str {
		match self {
			Self::Joined => "join",
			Self::Polled => "poll",
		}
	}
}

/// Pending table plus the tasks that resolve its entries.
#[derive(Clone)]
pub struct Readiness {
	pub(crate) table: Arc<PendingTable>,
	pub(crate) host: Arc<dyn ServerHost>,
	pub(crate) runtime: WorkerRuntime,
	pub(crate) config: ReadinessConfig,
	/// Stops the poll loop and disarms pending watchdogs.
	pub(crate) halt: ScopedToken,
}

impl Readiness {
	pub fn new(host: Arc<dyn ServerHost>, runtime: WorkerRuntime, config: ReadinessConfig) -> Self {
		Self {
			table: Arc::new(PendingTable::new()),
			host,
			runtime,
			config,
			halt: ScopedToken::detached(0),
		}
	}

	pub fn table(&self) -> &PendingTable {
		&self.table
	}

	pub const fn config(&self) -> &ReadinessConfig {
		&self.config
	}

	/// Registers follow-up commands for `actor` and arms its timeout watchdog.
	///
	/// Must be called before the spawn command is issued so a fast join
	/// cannot slip past the table.
	pub fn register(&self, actor: ActorId, batch: BatchId, commands: Vec<String>, reject_collisions: bool) -> Result<Registration, Collision> {
		let registration = self.table.register(actor.clone(), batch, commands, reject_collisions)?;
		tracing::debug!(%actor, %batch, generation = registration.generation(), "pending.register");
		self.arm_watchdog(actor, registration.generation());
		Ok(registration)
	}

	/// Drops a registration whose spawn command never reached the host.
	pub fn withdraw(&self, actor: &ActorId, generation: u64) -> bool {
		self.table.expire(actor.as_str(), generation).is_some()
	}

	/// Single entry point for both signal sources.
	///
	/// Returns `true` if this call won the claim and scheduled the follow-ups.
	pub fn reconcile(&self, actor: &str, signal: Signal) -> bool {
		let Some(claim) = self.table.claim(actor) else {
			tracing::trace!(actor, signal = signal.as_str(), "pending.reconcile.miss");
			return false;
		};
		tracing::info!(
			actor,
			signal = signal.as_str(),
			waited_ms = claim.waited.as_millis() as u64,
			follow_ups = claim.commands.len(),
			"pending.ready"
		);
		self.fire(claim);
		true
	}

	fn fire(&self, claim: Claim) {
		let host = Arc::clone(&self.host);
		let ReadinessConfig { settle, action_gap, .. } = self.config;
		let name = format!("fire {}", claim.actor);
		self.runtime.spawn(TaskClass::Fire, &name, async move {
			tokio::time::sleep(settle).await;
			for (n, command) in claim.commands.iter().enumerate() {
				if n > 0 {
					tokio::time::sleep(action_gap).await;
				}
				if let Err(err) = host.execute(command) {
					tracing::warn!(actor = %claim.actor, command = %command, error = %err, "pending.fire.failed");
				}
			}
			tracing::debug!(actor = %claim.actor, "pending.fired");
			claim.complete();
		});
	}

	/// Runs one poll of the online-actor list against the table.
	///
	/// Returns how many actors this poll fired.
	pub fn poll_once(&self) -> usize {
		if self.table.is_empty() {
			return 0;
		}
		let online = match self.host.online_actors() {
			Ok(online) => online,
			Err(err) => {
				tracing::debug!(error = %err, "pending.poll.failed");
				return 0;
			}
		};
		self.table
			.pending_actors()
			.iter()
			.filter(|actor| online.contains(actor.as_str()))
			.filter(|actor| self.reconcile(actor.as_str(), Signal::Polled))
			.count()
	}

	/// Stops the poll loop and lets armed watchdogs exit without sweeping.
	///
	/// Returns `false` if already halted.
	pub fn halt(&self) -> bool {
		self.halt.cancel()
	}

	/// Starts the background poll loop, if polling is enabled.
	///
	/// The loop runs until [`Readiness::halt`] or runtime shutdown.
	pub fn spawn_poll_loop(&self) -> Option<JoinHandle<Option<()>>> {
		let period = self.config.poll_interval.filter(|p| !p.is_zero())?;
		let this = self.clone();
		Some(self.runtime.spawn(TaskClass::Poll, "readiness-poll", async move {
			let mut ticker = tokio::time::interval(period);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			ticker.tick().await;
			loop {
				tokio::select! {
					biased;
					_ = this.halt.cancelled() => break,
					_ = ticker.tick() => {
						this.poll_once();
					}
				}
			}
			tracing::debug!("pending.poll.stopped");
		}))
	}
}
