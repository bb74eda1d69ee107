//! Timeout watchdogs for pending entries.

use std::collections::BTreeSet;

use troupe_worker::TaskClass;

use crate::error::HostError;
use crate::readiness::Readiness;
use crate::types::ActorId;

impl Readiness {
	/// Spawns the watchdog for one registration.
	///
	/// On wake-up it only acts if the entry is still the same registration;
	/// a fired, cleared, or superseded entry makes it a no-op.
	pub(crate) fn arm_watchdog(&self, actor: ActorId, generation: u64) {
		let this = self.clone();
		let name = format!("watchdog {actor}");
		self.runtime.spawn(TaskClass::Watchdog, &name, async move {
			tokio::select! {
				_ = this.halt.cancelled() => {}
				_ = tokio::time::sleep(this.config.timeout) => {
					this.sweep(&actor, generation);
				}
			}
		});
	}

	/// Expires `actor` if `generation` is still pending. Returns whether it did.
	pub(crate) fn sweep(&self, actor: &ActorId, generation: u64) -> bool {
		let Some(waited) = self.table.expire(actor.as_str(), generation) else {
			return false;
		};
		let online = describe_online(self.host.online_actors());
		tracing::warn!(%actor, waited_ms = waited.as_millis() as u64, %online, "pending.timeout");
		true
	}
}

fn describe_online(snapshot: Result<BTreeSet<String>, HostError>) -> String {
	match snapshot {
		Ok(online) if online.is_empty() => "no actors online".to_string(),
		Ok(online) => online.into_iter().collect::<Vec<_>>().join(", "),
		Err(err) => format!("online actor list unavailable: {err}"),
	}
}
