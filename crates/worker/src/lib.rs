//! Tracked task runtime shared by the batch orchestration crates.
//!
//! Every background task (batch runners, follow-up fires, timeout watchdogs,
//! the readiness poll loop) is spawned through [`WorkerRuntime`] so it can be
//! enumerated, awaited, and cancelled deterministically on shutdown.

mod class;
mod registry;
mod runtime;
mod spawn;
mod token;

pub use class::TaskClass;
pub use registry::{WorkerRecord, WorkerRegistry};
pub use runtime::{ShutdownMode, ShutdownReport, WorkerRuntime};
pub use token::{IdClock, ScopedToken};
