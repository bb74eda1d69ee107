//! The `!!plb` command grammar.
//!
//! ```text
//! !!plb
//! !!plb <name> <start> <end> <action...>
//! !!plb li <name> <start> <end> <direction> <spacing> <action...>
//! !!plb re <name> <start> <end> <direction1> <direction2> <spacing> <action...>
//! !!plb init <name> <start> <length> <act_secs> <between_secs> <action...>
//! !!plb stop [batch]
//! !!plb status
//! ```
//!
//! `<name>` and direction arguments may be double-quoted. The action is the
//! raw remainder of the line; `spawn && look north && use` splits into the
//! action `spawn` and the follow-ups `look north`, `use`.

use crate::error::ParseError;

/// Command roots accepted by [`parse`].
pub const ROOTS: [&str; 2] = ["!!playerbatch", "!!plb"];

/// Action text with its `&&`-separated follow-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
	pub action: String,
	pub follow_ups: Vec<String>,
}

impl ActionSpec {
	fn parse(raw: &str) -> Result<Self, ParseError> {
		let mut parts = raw.split("&&").map(str::trim);
		let action = parts.next().filter(|a| !a.is_empty()).ok_or(ParseError::MissingArgument("action"))?.to_string();
		let follow_ups = parts
			.map(|part| if part.is_empty() { Err(ParseError::EmptyFollowUp) } else { Ok(part.to_string()) })
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self { action, follow_ups })
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
	Help,
	Status,
	/// Stop every running batch, or just the given one.
	Stop {
		batch: Option<u64>,
	},
	Range {
		name: String,
		start: i64,
		end: i64,
		action: ActionSpec,
	},
	Line {
		name: String,
		start: i64,
		end: i64,
		direction: String,
		spacing: f64,
		action: ActionSpec,
	},
	Grid {
		name: String,
		start: i64,
		end: i64,
		rows: String,
		columns: String,
		spacing: f64,
		action: ActionSpec,
	},
	Init {
		name: String,
		start: i64,
		length: i64,
		act_secs: f64,
		between_secs: f64,
		action: String,
	},
}

/// Parses one chat or console line.
///
/// Returns `Ok(None)` if the line is not addressed to this plugin.
pub fn parse(line: &str) -> Result<Option<Request>, ParseError> {
	let line = line.trim();
	let Some(rest) = ROOTS.iter().find_map(|root| strip_root(line, root)) else {
		return Ok(None);
	};
	let mut args = Args::new(rest);
	let request = match args.peek_keyword() {
		None => Request::Help,
		Some("stop") => {
			args.keyword();
			let batch = args.optional()?.map(|raw| batch_id(&raw)).transpose()?;
			args.finish()?;
			Request::Stop { batch }
		}
		Some("status") => {
			args.keyword();
			args.finish()?;
			Request::Status
		}
		Some("li") => {
			args.keyword();
			Request::Line {
				name: args.text("name")?,
				start: args.integer("start")?,
				end: args.integer("end")?,
				direction: args.text("direction")?,
				spacing: args.number("spacing")?,
				action: ActionSpec::parse(args.rest())?,
			}
		}
		Some("re") => {
			args.keyword();
			Request::Grid {
				name: args.text("name")?,
				start: args.integer("start")?,
				end: args.integer("end")?,
				rows: args.text("direction1")?,
				columns: args.text("direction2")?,
				spacing: args.number("spacing")?,
				action: ActionSpec::parse(args.rest())?,
			}
		}
		Some("init") => {
			args.keyword();
			let (name, start, length) = (args.text("name")?, args.integer("start")?, args.integer("length")?);
			let (act_secs, between_secs) = (args.number("act_secs")?, args.number("between_secs")?);
			let action = args.rest().trim();
			if action.is_empty() {
				return Err(ParseError::MissingArgument("action"));
			}
			Request::Init {
				name,
				start,
				length,
				act_secs,
				between_secs,
				action: action.to_string(),
			}
		}
		Some(_) => Request::Range {
			name: args.text("name")?,
			start: args.integer("start")?,
			end: args.integer("end")?,
			action: ActionSpec::parse(args.rest())?,
		},
	};
	Ok(Some(request))
}

fn strip_root<'a>(line: &'a str, root: &str) -> Option<&'a str> {
	let rest = line.strip_prefix(root)?;
	(rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

/// Batch ids print as `#n`; the `#` is optional on input.
fn batch_id(raw: &str) -> Result<u64, ParseError> {
	raw.trim_start_matches('#').parse().map_err(|_| ParseError::InvalidInteger {
		name: "batch",
		value: raw.to_string(),
	})
}

fn integer(name: &'static str, raw: &str) -> Result<i64, ParseError> {
	raw.parse().map_err(|_| ParseError::InvalidInteger {
		name,
		value: raw.to_string(),
	})
}

/// Cursor over the arguments following the root.
struct Args<'a> {
	rest: &'a str,
}

impl<'a> Args<'a> {
	fn new(rest: &'a str) -> Self {
		Self { rest: rest.trim_start() }
	}

	/// The next bare word, without consuming it.
	fn peek_keyword(&self) -> Option<&'a str> {
		self.rest.split_whitespace().next()
	}

	fn keyword(&mut self) {
		let word_len = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
		self.rest = self.rest[word_len..].trim_start();
	}

	/// Next token, honouring double quotes. `None` at end of input.
	fn optional(&mut self) -> Result<Option<String>, ParseError> {
		if self.rest.is_empty() {
			return Ok(None);
		}
		let token = if let Some(quoted) = self.rest.strip_prefix('"') {
			let close = quoted.find('"').ok_or(ParseError::UnterminatedQuote)?;
			let token = quoted[..close].to_string();
			self.rest = &quoted[close + 1..];
			token
		} else {
			let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
			let token = self.rest[..end].to_string();
			self.rest = &self.rest[end..];
			token
		};
		self.rest = self.rest.trim_start();
		Ok(Some(token))
	}

	fn text(&mut self, name: &'static str) -> Result<String, ParseError> {
		self.optional()?.ok_or(ParseError::MissingArgument(name))
	}

	fn integer(&mut self, name: &'static str) -> Result<i64, ParseError> {
		integer(name, &self.text(name)?)
	}

	fn number(&mut self, name: &'static str) -> Result<f64, ParseError> {
		let raw = self.text(name)?;
		raw.parse().map_err(|_| ParseError::InvalidNumber { name, value: raw })
	}

	/// Everything left, verbatim.
	fn rest(&mut self) -> &'a str {
		std::mem::take(&mut self.rest)
	}

	fn finish(&mut self) -> Result<(), ParseError> {
		match self.optional()? {
			Some(extra) => Err(ParseError::UnexpectedArgument(extra)),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn action(text: &str) -> ActionSpec {
		ActionSpec {
			action: text.to_string(),
			follow_ups: Vec::new(),
		}
	}

	#[test]
	fn foreign_lines_are_ignored() {
		assert_eq!(parse("hello there"), Ok(None));
		assert_eq!(parse("!!plbx 1 2"), Ok(None));
		assert_eq!(parse("!!help"), Ok(None));
	}

	#[test]
	fn bare_root_is_help() {
		assert_eq!(parse("!!plb"), Ok(Some(Request::Help)));
		assert_eq!(parse("  !!playerbatch  "), Ok(Some(Request::Help)));
	}

	#[test]
	fn range_keeps_action_verbatim() {
		assert_eq!(
			parse("!!plb test 1 3 spawn at 0 64  0"),
			Ok(Some(Request::Range {
				name: "test".into(),
				start: 1,
				end: 3,
				action: action("spawn at 0 64  0"),
			}))
		);
	}

	#[test]
	fn quoted_names_may_contain_spaces() {
		let Ok(Some(Request::Range { name, .. })) = parse(r#"!!plb "a b" 1 2 jump"#) else {
			panic!("expected a range request");
		};
		assert_eq!(name, "a b");
		assert_eq!(parse(r#"!!plb "a b 1 2 jump"#), Err(ParseError::UnterminatedQuote));
	}

	#[test]
	fn line_and_grid() {
		assert_eq!(
			parse("!!plb li bot 1 5 +x 3 spawn"),
			Ok(Some(Request::Line {
				name: "bot".into(),
				start: 1,
				end: 5,
				direction: "+x".into(),
				spacing: 3.0,
				action: action("spawn"),
			}))
		);
		assert_eq!(
			parse("!!plb re bot 1 4 +x -z 1.5 spawn"),
			Ok(Some(Request::Grid {
				name: "bot".into(),
				start: 1,
				end: 4,
				rows: "+x".into(),
				columns: "-z".into(),
				spacing: 1.5,
				action: action("spawn"),
			}))
		);
	}

	#[test]
	fn follow_ups_split_on_double_ampersand() {
		let Ok(Some(Request::Range { action, .. })) = parse("!!plb t 1 2 spawn && look north &&use continuous") else {
			panic!("expected a range request");
		};
		assert_eq!(action, ActionSpec {
			action: "spawn".into(),
			follow_ups: vec!["look north".into(), "use continuous".into()],
		});
		assert_eq!(parse("!!plb t 1 2 spawn && "), Err(ParseError::EmptyFollowUp));
	}

	#[test]
	fn init_stop_and_status() {
		assert_eq!(
			parse("!!plb init test 1 2 1 2.5 use continuous"),
			Ok(Some(Request::Init {
				name: "test".into(),
				start: 1,
				length: 2,
				act_secs: 1.0,
				between_secs: 2.5,
				action: "use continuous".into(),
			}))
		);
		assert_eq!(parse("!!plb stop"), Ok(Some(Request::Stop { batch: None })));
		assert_eq!(parse("!!plb stop #4"), Ok(Some(Request::Stop { batch: Some(4) })));
		assert_eq!(parse("!!plb stop 4 5"), Err(ParseError::UnexpectedArgument("5".into())));
		assert_eq!(parse("!!plb status"), Ok(Some(Request::Status)));
	}

	#[test]
	fn argument_errors_name_the_argument() {
		assert_eq!(parse("!!plb test one 3 spawn"), Err(ParseError::InvalidInteger {
			name: "start",
			value: "one".into(),
		}));
		assert_eq!(parse("!!plb test 1 3"), Err(ParseError::MissingArgument("action")));
		assert_eq!(parse("!!plb li bot 1 5 +x"), Err(ParseError::MissingArgument("spacing")));
		assert_eq!(parse("!!plb li bot 1 5 +x far spawn"), Err(ParseError::InvalidNumber {
			name: "spacing",
			value: "far".into(),
		}));
		assert_eq!(parse("!!plb init t 1 2 1 1"), Err(ParseError::MissingArgument("action")));
	}
}
