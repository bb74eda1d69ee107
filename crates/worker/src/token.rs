use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic id source shared by clones, starting at 1.
#[derive(Debug, Default, Clone)]
pub struct IdClock {
	next: Arc<AtomicU64>,
}

impl IdClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next id.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Cancellation token scoped to one unit of work (one batch).
///
/// Each batch gets a fresh token, so a stop observed by one run can never
/// leak into a batch started afterwards.
#[derive(Debug, Clone)]
pub struct ScopedToken {
	id: u64,
	cancel: CancellationToken,
}

impl ScopedToken {
	pub fn new(id: u64, cancel: CancellationToken) -> Self {
		Self { id, cancel }
	}

	/// Creates a detached token that is not linked to any parent.
	pub fn detached(id: u64) -> Self {
		Self::new(id, CancellationToken::new())
	}

	pub const fn id(&self) -> u64 {
		self.id
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Returns `false` if it was already requested.
	pub fn cancel(&self) -> bool {
		let fresh = !self.cancel.is_cancelled();
		self.cancel.cancel();
		fresh
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}
}
