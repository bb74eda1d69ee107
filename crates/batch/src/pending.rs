//! Pending follow-up actions keyed by actor.
//!
//! Every mutation (register, claim, expire, clear) happens under one lock, so
//! of the four parties racing for an entry (push notification, poll, timeout
//! watchdog, stop request) exactly one observes and removes it.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::types::{ActorId, BatchId};

/// How a pending entry left the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	/// Readiness was observed and every follow-up command was submitted.
	Fired,
	/// No readiness signal arrived within the timeout window.
	TimedOut,
	/// A stop request cleared the entry.
	Cleared,
	/// A later registration for the same actor replaced this one.
	Superseded,
}

/// Registration refused because the actor is already awaiting readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
	pub actor: ActorId,
	pub owner: BatchId,
}

struct PendingEntry {
	generation: u64,
	batch: BatchId,
	commands: Vec<String>,
	registered_at: Instant,
	done: oneshot::Sender<Resolution>,
}

impl PendingEntry {
	fn resolve(self, resolution: Resolution) {
		let _ = self.done.send(resolution);
	}
}

/// Receipt of one registration.
#[derive(Debug)]
pub struct Registration {
	generation: u64,
	resolved: oneshot::Receiver<Resolution>,
}

impl Registration {
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Waits until the entry leaves the table.
	///
	/// An entry dropped without an explicit resolution (runtime shutdown)
	/// counts as cleared.
	pub async fn resolved(self) -> Resolution {
		self.resolved.await.unwrap_or(Resolution::Cleared)
	}
}

/// An entry claimed for firing; the claimant owns its completion.
pub struct Claim {
	pub actor: ActorId,
	pub commands: Vec<String>,
	pub waited: std::time::Duration,
	done: oneshot::Sender<Resolution>,
}

impl Claim {
	/// Marks the claimed entry as fired.
	pub fn complete(self) {
		let _ = self.done.send(Resolution::Fired);
	}
}

#[derive(Default)]
struct TableState {
	entries: HashMap<ActorId, PendingEntry>,
	next_generation: u64,
}

/// Table of actors awaiting readiness and the commands to run when ready.
#[derive(Default)]
pub struct PendingTable {
	state: Mutex<TableState>,
}

impl PendingTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers follow-up `commands` for `actor`.
	///
	/// An existing entry is replaced (last write wins) and resolved as
	/// [`Resolution::Superseded`], unless `reject_collisions` is set.
	pub fn register(&self, actor: ActorId, batch: BatchId, commands: Vec<String>, reject_collisions: bool) -> Result<Registration, Collision> {
		let (done, resolved) = oneshot::channel();
		let mut state = self.state.lock();
		if reject_collisions && let Some(existing) = state.entries.get(&actor) {
			return Err(Collision { actor, owner: existing.batch });
		}
		state.next_generation += 1;
		let generation = state.next_generation;
		let entry = PendingEntry {
			generation,
			batch,
			commands,
			registered_at: Instant::now(),
			done,
		};
		if let Some(previous) = state.entries.insert(actor.clone(), entry) {
			tracing::debug!(%actor, previous_batch = %previous.batch, %batch, "pending.superseded");
			previous.resolve(Resolution::Superseded);
		}
		Ok(Registration { generation, resolved })
	}

	/// Removes `actor` for firing. Only the first caller gets the claim.
	pub fn claim(&self, actor: &str) -> Option<Claim> {
		let (actor, entry) = self.state.lock().entries.remove_entry(actor)?;
		Some(Claim {
			actor,
			commands: entry.commands,
			waited: entry.registered_at.elapsed(),
			done: entry.done,
		})
	}

	/// Removes `actor` if it is still the registration `generation`.
	///
	/// Returns how long the entry waited, or `None` if it already left.
	pub fn expire(&self, actor: &str, generation: u64) -> Option<std::time::Duration> {
		let entry = {
			let mut state = self.state.lock();
			if state.entries.get(actor).is_none_or(|e| e.generation != generation) {
				return None;
			}
			state.entries.remove(actor)?
		};
		let waited = entry.registered_at.elapsed();
		entry.resolve(Resolution::TimedOut);
		Some(waited)
	}

	/// Drops every entry. Returns how many were removed.
	pub fn clear(&self) -> usize {
		let drained: Vec<_> = self.state.lock().entries.drain().collect();
		let count = drained.len();
		for (_, entry) in drained {
			entry.resolve(Resolution::Cleared);
		}
		count
	}

	/// Drops entries registered by `batch`. Returns how many were removed.
	pub fn clear_batch(&self, batch: BatchId) -> usize {
		let removed: Vec<_> = {
			let mut state = self.state.lock();
			let ids: Vec<_> = state.entries.iter().filter(|(_, e)| e.batch == batch).map(|(id, _)| id.clone()).collect();
			ids.into_iter().filter_map(|id| state.entries.remove(&id)).collect()
		};
		let count = removed.len();
		for entry in removed {
			entry.resolve(Resolution::Cleared);
		}
		count
	}

	pub fn contains(&self, actor: &str) -> bool {
		self.state.lock().entries.contains_key(actor)
	}

	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Actors currently awaiting readiness, sorted.
	pub fn pending_actors(&self) -> Vec<ActorId> {
		let mut ids: Vec<_> = self.state.lock().entries.keys().cloned().collect();
		ids.sort();
		ids
	}
}
