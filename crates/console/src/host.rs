//! A stand-in server: prints every command and brings spawned actors online
//! after a delay.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use troupe_batch::{HostError, ServerHost};

/// How a simulated join is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinNotice {
	/// Send the name on the join channel, like a server join event.
	Push,
	/// Only update the online list; readiness must be found by polling.
	PollOnly,
}

pub struct SimulatedHost {
	online: Arc<Mutex<BTreeSet<String>>>,
	joins: mpsc::UnboundedSender<String>,
	join_delay: Option<Duration>,
	notice: JoinNotice,
	runtime: Handle,
}

impl SimulatedHost {
	/// Spawned actors come online after `join_delay`, or never if `None`.
	///
	/// Must be called from within a tokio runtime.
	pub fn new(joins: mpsc::UnboundedSender<String>, join_delay: Option<Duration>, notice: JoinNotice) -> Self {
		Self {
			online: Arc::default(),
			joins,
			join_delay,
			notice,
			runtime: Handle::current(),
		}
	}

	fn schedule_join(&self, name: &str) {
		let Some(delay) = self.join_delay else {
			return;
		};
		let online = Arc::clone(&self.online);
		let joins = self.joins.clone();
		let (notice, name) = (self.notice, name.to_string());
		self.runtime.spawn(async move {
			tokio::time::sleep(delay).await;
			if !online.lock().insert(name.clone()) {
				return;
			}
			tracing::debug!(actor = %name, "host.join");
			if notice == JoinNotice::Push {
				let _ = joins.send(name);
			}
		});
	}
}

impl ServerHost for SimulatedHost {
	fn execute(&self, command: &str) -> Result<(), HostError> {
		let Some((actor, verb)) = player_command(command) else {
			return Err(HostError::new(format!("unknown command: {command}")));
		};
		println!("> {command}");
		match verb {
			"spawn" => self.schedule_join(actor),
			"kill" => {
				if self.online.lock().remove(actor) {
					tracing::debug!(actor, "host.leave");
				}
			}
			_ if !self.online.lock().contains(actor) => return Err(HostError::new(format!("{actor} is not online"))),
			_ => {}
		}
		Ok(())
	}

	fn online_actors(&self) -> Result<BTreeSet<String>, HostError> {
		Ok(self.online.lock().clone())
	}
}

/// Actor name and verb of a `player <name> <verb> ...` command, with or
/// without an `execute ... run` wrapper.
pub fn player_command(command: &str) -> Option<(&str, &str)> {
	let body = command.rsplit_once(" run ").map_or(command, |(_, body)| body);
	let mut words = body.strip_prefix("player ")?.split_whitespace();
	Some((words.next()?, words.next()?))
}
