//! Routing of parsed `!!plb` commands onto the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use troupe_batch::{BatchDescriptor, BatchHandle, BatchId, InitDescriptor, Invocation, Orchestrator, ServerHost, ShutdownReport, ValidationError};

use crate::config::PluginConfig;
use crate::grammar::{self, ActionSpec, Request};
use crate::help::help_text;
use crate::permission::PermissionGate;
use crate::source::{CommandSource, SourceReplies, context_of};

/// What [`PlayerBatch::handle`] did with a line.
#[derive(Debug)]
pub enum Dispatch {
	/// Not a `!!plb` command.
	Ignored,
	/// The source lacks the configured permission level.
	Denied,
	/// Parse or validation error, reported to the source.
	Rejected,
	/// Answered directly (help, status, stop).
	Replied,
	/// A batch is running in the background.
	Started(BatchHandle),
}

/// The `!!plb` command handler.
pub struct PlayerBatch {
	gate: PermissionGate,
	orchestrator: Orchestrator,
}

impl PlayerBatch {
	/// Must be called from within a tokio runtime.
	pub fn new(config: PluginConfig, host: Arc<dyn ServerHost>) -> Self {
		let orchestrator = Orchestrator::new(host, config.to_core_config());
		Self {
			gate: PermissionGate::new(config.permission),
			orchestrator,
		}
	}

	pub const fn orchestrator(&self) -> &Orchestrator {
		&self.orchestrator
	}

	/// Handles one line sent by `source`.
	pub fn handle(&self, source: &Arc<dyn CommandSource>, line: &str) -> Dispatch {
		let Some(parsed) = grammar::parse(line).transpose() else {
			return Dispatch::Ignored;
		};
		if !self.gate.allows(source.as_ref()) {
			tracing::debug!(player = source.player(), level = source.permission_level(), required = self.gate.required(), "command.denied");
			source.reply("§cpermission denied");
			return Dispatch::Denied;
		}
		let request = match parsed {
			Ok(request) => request,
			Err(err) => {
				source.reply(&format!("§cerror: {err}; type !!plb for help"));
				return Dispatch::Rejected;
			}
		};
		tracing::debug!(player = source.player(), ?request, "command.accepted");
		match self.dispatch(source, request) {
			Ok(dispatch) => dispatch,
			Err(err) => {
				source.reply(&format!("§cerror: {err}"));
				Dispatch::Rejected
			}
		}
	}

	fn dispatch(&self, source: &Arc<dyn CommandSource>, request: Request) -> Result<Dispatch, ValidationError> {
		let invocation = Invocation::new(context_of(source.as_ref()), Arc::new(SourceReplies(Arc::clone(source))));
		let orch = &self.orchestrator;
		let handle = match request {
			Request::Help => {
				source.reply(&help_text());
				return Ok(Dispatch::Replied);
			}
			Request::Status => {
				source.reply(&self.status());
				return Ok(Dispatch::Replied);
			}
			Request::Stop { batch: None } => {
				let summary = orch.request_stop();
				source.reply(&format!("§astopped {} batches, dropped {} pending bots", summary.batches, summary.cleared));
				return Ok(Dispatch::Replied);
			}
			Request::Stop { batch: Some(id) } => {
				let id = BatchId(id);
				match orch.request_stop_batch(id) {
					Some(summary) => source.reply(&format!("§astopped batch {id}, dropped {} pending bots", summary.cleared)),
					None => source.reply(&format!("§eno running batch {id}")),
				}
				return Ok(Dispatch::Replied);
			}
			Request::Range { name, start, end, action } => {
				let desc = with_follow_ups(BatchDescriptor::range(name, start, end, action.action.as_str())?, action)?;
				orch.run_range_batch(desc, invocation)?
			}
			Request::Line {
				name,
				start,
				end,
				direction,
				spacing,
				action,
			} => {
				let desc = with_follow_ups(BatchDescriptor::line(name, start, end, &direction, spacing, action.action.as_str())?, action)?;
				orch.run_line_batch(desc, invocation)?
			}
			Request::Grid {
				name,
				start,
				end,
				rows,
				columns,
				spacing,
				action,
			} => {
				let desc = with_follow_ups(BatchDescriptor::grid(name, start, end, &rows, &columns, spacing, None, action.action.as_str())?, action)?;
				orch.run_grid_batch(desc, invocation)?
			}
			Request::Init {
				name,
				start,
				length,
				act_secs,
				between_secs,
				action,
			} => orch.run_init_sequence(InitDescriptor::new(name, start, length, act_secs, between_secs, action)?, invocation)?,
		};
		tracing::info!(batch = %handle.id(), player = source.player(), "command.started");
		Ok(Dispatch::Started(handle))
	}

	fn status(&self) -> String {
		let active = self.orchestrator.active_batches();
		let pending = self.orchestrator.pending_actors().len();
		if active.is_empty() {
			return format!("§7no running batches, {pending} bots awaiting readiness");
		}
		let mut lines = vec![format!("§6{} running batches, {pending} bots awaiting readiness", active.len())];
		lines.extend(active.iter().map(|r| format!("§7#{} {} §e{}/{}", r.id, r.label, r.completed, r.total)));
		lines.join("\n")
	}

	/// Push notification from the server that `name` joined.
	pub fn on_player_joined(&self, name: &str) -> bool {
		self.orchestrator.actor_joined(name)
	}

	pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
		self.orchestrator.shutdown(timeout).await
	}
}

fn with_follow_ups(desc: BatchDescriptor, action: ActionSpec) -> Result<BatchDescriptor, ValidationError> {
	desc.with_follow_ups(action.follow_ups)
}
