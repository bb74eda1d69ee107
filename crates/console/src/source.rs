use troupe_plugin::CommandSource;

/// The terminal user, acting either as the server console or as a player.
pub struct ConsoleSource {
	player: Option<String>,
	level: u32,
}

impl ConsoleSource {
	pub fn new(player: Option<String>, level: u32) -> Self {
		Self { player, level }
	}
}

impl CommandSource for ConsoleSource {
	fn player(&self) -> Option<&str> {
		self.player.as_deref()
	}

	fn permission_level(&self) -> u32 {
		self.level
	}

	fn reply(&self, message: &str) {
		eprintln!("{}", plain(message));
	}
}

/// Drops `§x` formatting codes.
pub fn plain(message: &str) -> String {
	let mut out = String::with_capacity(message.len());
	let mut chars = message.chars();
	while let Some(c) = chars.next() {
		if c == '§' {
			chars.next();
		} else {
			out.push(c);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn formatting_codes_are_stripped() {
		assert_eq!(plain("§aoperated §ebot_t[1-2]"), "operated bot_t[1-2]");
		assert_eq!(plain("no codes"), "no codes");
		assert_eq!(plain("trailing §"), "trailing ");
	}
}
