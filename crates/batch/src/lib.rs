//! Batch orchestration of short-lived actors inside a live server.
//!
//! # Purpose
//!
//! - Turn compact batch descriptors (range, line, grid, init sequence) into ordered server commands and run them on tracked background tasks.
//! - Reconcile "actor is online" signals, pushed by the host or found by polling, against a table of per-actor follow-up actions.
//! - Support race-free cooperative cancellation of long-running batches, one batch or all of them.
//! - Exclude the command transport itself and parsing of user input; see the `troupe-plugin` crate for the latter.
//!
//! # Mental model
//!
//! - A batch flows plan → sequence → run. Planning and sequencing are pure and synchronous; only the run is asynchronous.
//! - The runner owns one [`troupe_worker::ScopedToken`] per batch and checks it at every step boundary. Sleeps already in progress are not interrupted.
//! - For spawning actions with follow-ups, the runner registers the follow-ups in the [`PendingTable`] before issuing the spawn command.
//! - Push notifications ([`Orchestrator::actor_joined`]) and the poll loop both call [`Readiness::reconcile`]. The claim happens under the table lock; only the winner fires.
//! - Every registration arms a watchdog that expires the entry after the readiness timeout, but only if the entry is still the same registration.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`BatchDescriptor`] | Immutable range, line or grid request | MUST be validated at construction; planning never fails | `BatchDescriptor::range`, `BatchDescriptor::line`, `BatchDescriptor::grid` |
//! | [`InitDescriptor`] | Serial spawn, act, kill lifecycle | MUST have length ≥ 1 and finite non-negative intervals | `InitDescriptor::new` |
//! | [`Plan`] | Lazy placement iterator | MUST yield ascending indices; cloning restarts from the clone point | `BatchDescriptor::plan` |
//! | [`PendingTable`] | Actor → follow-up commands | MUST remove each entry exactly once | `PendingTable::register`, `PendingTable::claim`, `PendingTable::expire`, `PendingTable::clear` |
//! | [`Readiness`] | Reconciler, sweeper and poll loop over one table | MUST fire only on a won claim | `Readiness::reconcile`, `Readiness::poll_once` |
//! | [`Orchestrator`] | Public facade | MUST register each batch token before spawning its task | `Orchestrator::run_*`, `Orchestrator::request_stop` |
//! | [`BatchReport`] | Final account of one batch | `Stopped` carries the last fully completed index | `BatchRunner::run_sequence`, `BatchRunner::run_init` |
//!
//! # Invariants
//!
//! 1. Follow-ups for an actor MUST fire at most once, whichever of push and poll observes it first.
//!    - Enforced in: `PendingTable::claim`, `Readiness::reconcile`
//!    - Tested by: `readiness::tests::concurrent_push_and_poll_fire_each_actor_once`
//!    - Failure symptom: duplicate follow-up commands for the same actor.
//!
//! 2. A watchdog MUST only expire the registration it was armed for.
//!    - Enforced in: `PendingTable::expire`
//!    - Tested by: `pending::tests::reregistration_supersedes_and_stale_expiry_is_ignored`
//!    - Failure symptom: a re-registered actor loses its follow-ups to a stale timeout.
//!
//! 3. A stop request MUST NOT affect batches started after it.
//!    - Enforced in: `Orchestrator::launch` (fresh token per batch)
//!    - Tested by: `orchestrator::tests::stop_does_not_leak_into_later_batches`
//!    - Failure symptom: a new batch aborts immediately after an earlier stop.
//!
//! 4. Follow-ups MUST be registered before the spawn command is issued.
//!    - Enforced in: `BatchRunner::run_sequence`, `BatchRunner::run_init`
//!    - Tested by: `runner::tests::follow_ups_are_registered_before_spawn`
//!    - Failure symptom: a fast join slips past the table and the actor never runs its follow-ups.
//!
//! 5. A finished, panicked or aborted batch MUST leave the live set and the progress registry.
//!    - Enforced in: `LiveGuard::drop`
//!    - Tested by: `orchestrator::tests::panicking_batch_is_contained_and_reported`
//!    - Failure symptom: `request_stop` counts ghost batches; `active_batches` never empties.
//!
//! 6. No lock is held across an `.await` or a host call.
//!    - Enforced in: `PendingTable` (entries resolved after the guard drops), `Readiness::fire`
//!    - Tested by: `readiness::tests::concurrent_push_and_poll_fire_each_actor_once`
//!    - Failure symptom: deadlock between the poll loop and a push handler.

mod config;
mod error;
mod geometry;
mod host;
mod orchestrator;
mod pending;
mod readiness;
mod runner;
mod sequencer;
mod sweeper;
#[cfg(test)]
mod testing;
mod types;

pub use config::CoreConfig;
pub use error::{HostError, ValidationError};
pub use geometry::{BatchDescriptor, Direction, InitDescriptor, Offset, Plan, PlannedPlacement, Shape, seconds};
pub use host::{InvocationContext, ReplyKind, Requester, ServerHost};
pub use orchestrator::{BatchHandle, Invocation, Orchestrator, StopSummary};
pub use pending::{Claim, Collision, PendingTable, Registration, Resolution};
pub use readiness::{Readiness, ReadinessConfig, Signal};
pub use runner::{BatchOutcome, BatchReport};
pub use sequencer::{PlacementStyle, Sequence, Step, follow_up_commands, has_positioning, render, sequence, spawns_actors};
pub use troupe_worker::{ShutdownReport, WorkerRecord};
pub use types::{ActorId, BatchId};
