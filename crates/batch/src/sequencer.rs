//! Command rendering for planned placements.
//!
//! Output order is exactly plan order; nothing is reordered or deduplicated.

use serde::{Deserialize, Serialize};

use crate::geometry::{Offset, Plan, PlannedPlacement};
use crate::host::InvocationContext;
use crate::types::ActorId;

/// How a placement offset is expressed in the command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStyle {
	/// Append ` at ~dx ~ ~dz` to the action.
	#[default]
	ActionClause,
	/// Wrap the command in `positioned ~dx ~ ~dz positioned over world_surface`.
	SurfaceSnap,
}

/// One executable command for one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
	pub actor: ActorId,
	pub index: i64,
	pub command: String,
}

/// Whether `action` may already carry its own `at` positioning clause.
///
/// Any occurrence of `at` counts, inside words too, so actions such as
/// `attack` or `rotate` are never given an injected clause.
pub fn has_positioning(action: &str) -> bool {
	action.contains("at")
}

/// Whether `action` creates its actor, so readiness can be awaited.
pub fn spawns_actors(action: &str) -> bool {
	action.split_whitespace().next() == Some("spawn")
}

/// Renders the command for one actor action in the given context.
pub fn render(context: &InvocationContext, actor: &ActorId, action: &str, offset: Option<Offset>, style: PlacementStyle) -> String {
	let offset = offset.filter(|_| !has_positioning(action));
	match (offset, style) {
		(Some(offset), PlacementStyle::ActionClause) => wrap(context, None, &format!("player {actor} {action} at {}", offset.tilde())),
		(Some(offset), PlacementStyle::SurfaceSnap) => wrap(context, Some(offset), &format!("player {actor} {action}")),
		(None, _) => wrap(context, None, &format!("player {actor} {action}")),
	}
}

fn wrap(context: &InvocationContext, positioned: Option<Offset>, body: &str) -> String {
	let position = positioned.map(|o| format!("positioned {} positioned over world_surface", o.tilde()));
	match (context, position) {
		(InvocationContext::Player(player), Some(position)) => format!("execute as {player} at @s {position} run {body}"),
		(InvocationContext::Player(player), None) => format!("execute as {player} at @s run {body}"),
		(InvocationContext::Console, Some(position)) => format!("execute {position} run {body}"),
		(InvocationContext::Console, None) => body.to_string(),
	}
}

/// Maps a plan onto commands for `action`, one per placement, in plan order.
pub fn sequence(plan: Plan, context: InvocationContext, action: impl Into<String>, style: PlacementStyle) -> Sequence {
	Sequence {
		plan,
		context,
		action: action.into(),
		style,
	}
}

/// Owned, lazily rendered command sequence of one batch.
///
/// Each [`Step`] is rendered when it is pulled, so a batch holds one
/// command at a time however many actors it spans.
#[derive(Debug, Clone)]
pub struct Sequence {
	plan: Plan,
	context: InvocationContext,
	action: String,
	style: PlacementStyle,
}

impl Iterator for Sequence {
	type Item = Step;

	fn next(&mut self) -> Option<Self::Item> {
		let PlannedPlacement { actor, index, offset } = self.plan.next()?;
		Some(Step {
			command: render(&self.context, &actor, &self.action, offset, self.style),
			actor,
			index,
		})
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.plan.size_hint()
	}
}

impl ExactSizeIterator for Sequence {}

/// Renders unpositioned follow-up commands for one actor, in order.
pub fn follow_up_commands(context: &InvocationContext, actor: &ActorId, actions: &[String]) -> Vec<String> {
	actions.iter().map(|action| render(context, actor, action, None, PlacementStyle::ActionClause)).collect()
}
