use std::time::Duration;

use crate::readiness::ReadinessConfig;
use crate::sequencer::PlacementStyle;

/// Settings of one [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
	/// Prefix prepended to every actor name.
	pub base_name: String,
	/// Pause between successive spawn commands of a batch.
	pub interval: Duration,
	pub placement: PlacementStyle,
	pub readiness: ReadinessConfig,
	/// Refuse to register an actor that is already awaiting readiness,
	/// instead of replacing its entry.
	pub reject_collisions: bool,
}

impl Default for CoreConfig {
	fn default() -> Self {
		Self {
			base_name: "bot_".to_string(),
			interval: Duration::ZERO,
			placement: PlacementStyle::default(),
			readiness: ReadinessConfig::default(),
			reject_collisions: false,
		}
	}
}
