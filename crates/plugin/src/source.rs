//! The requester side of a command: who sent it and how to answer.

use std::sync::Arc;

use troupe_batch::{InvocationContext, ReplyKind, Requester};

/// Sender of one `!!plb` command.
pub trait CommandSource: Send + Sync + 'static {
	/// Player name, or `None` for the server console.
	fn player(&self) -> Option<&str>;

	fn permission_level(&self) -> u32;

	/// Sends one (possibly multi-line, `§`-formatted) message back.
	fn reply(&self, message: &str);
}

/// Frame the batch commands of `source` run in.
pub fn context_of(source: &dyn CommandSource) -> InvocationContext {
	match source.player() {
		Some(player) => InvocationContext::Player(player.to_string()),
		None => InvocationContext::Console,
	}
}

/// `§` color code for a reply of `kind`.
pub const fn color(kind: ReplyKind) -> &'static str {
	match kind {
		ReplyKind::Info => "§a",
		ReplyKind::Warning => "§e",
		ReplyKind::Error => "§c",
	}
}

/// Forwards batch replies to a command source, colored by kind.
pub struct SourceReplies(pub Arc<dyn CommandSource>);

impl Requester for SourceReplies {
	fn reply(&self, kind: ReplyKind, message: &str) {
		self.0.reply(&format!("{}{message}", color(kind)));
	}
}
