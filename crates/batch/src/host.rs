//! Interfaces to the live server process and to the requester of a batch.

use std::collections::BTreeSet;

use crate::error::HostError;

/// The live server that executes commands and knows which actors are online.
///
/// Both calls are synchronous and expected to be fast; implementations must
/// not block on the server's asynchronous side effects.
pub trait ServerHost: Send + Sync + 'static {
	/// Submits one command string.
	fn execute(&self, command: &str) -> Result<(), HostError>;

	/// Best-effort snapshot of the currently online actor names.
	fn online_actors(&self) -> Result<BTreeSet<String>, HostError>;
}

/// Severity of a reply sent back to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
	Info,
	Warning,
	Error,
}

/// Receives progress and outcome messages for a batch.
pub trait Requester: Send + Sync + 'static {
	fn reply(&self, kind: ReplyKind, message: &str);
}

/// Frame a batch was requested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationContext {
	/// Commands run as, and positioned relative to, this player.
	Player(String),
	/// Commands run from the server console.
	Console,
}
