/// Execution classes used for task tracing and registry snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// One running batch: a paced command sequence or an init lifecycle.
	Batch,
	/// Follow-up actions submitted for an actor that became ready.
	Fire,
	/// Per-registration readiness timeout watchdog.
	Watchdog,
	/// Periodic online-actor poll feeding the readiness reconciler.
	Poll,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Batch => "batch",
			Self::Fire => "fire",
			Self::Watchdog => "watchdog",
			Self::Poll => "poll",
		}
	}
}
