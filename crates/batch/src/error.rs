//! Error types for batch validation and host interaction.

use thiserror::Error;

/// A batch request that cannot be planned. Raised before any command is issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
	/// The index range is empty or inverted.
	#[error("start index {start} is greater than end index {end}")]
	InvalidRange { start: i64, end: i64 },

	/// A direction token outside `+x`, `-x`, `+z`, `-z`.
	#[error("unknown direction {0:?} (expected +x, -x, +z or -z)")]
	UnknownDirection(String),

	/// Grid width of zero.
	#[error("grid width must be at least 1")]
	NonPositiveWidth,

	/// Init sequence length of zero or less.
	#[error("length must be at least 1, got {0}")]
	NonPositiveLength(i64),

	/// Spacing must be a finite, non-negative distance.
	#[error("spacing must be a non-negative number, got {0}")]
	InvalidSpacing(f64),

	/// Interval must be a finite, non-negative number of seconds.
	#[error("interval must be a non-negative number of seconds, got {0}")]
	InvalidInterval(f64),

	/// The action template is blank.
	#[error("action must not be empty")]
	EmptyAction,

	/// Follow-up actions attached to an action that does not spawn actors.
	#[error("follow-up actions require a spawn action, got {0:?}")]
	FollowUpsWithoutSpawn(String),

	/// A descriptor of one shape was submitted to the entry point of another.
	#[error("expected a {expected} batch, got a {found} batch")]
	ShapeMismatch { expected: &'static str, found: &'static str },
}

/// Failure reported by the live server host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}
