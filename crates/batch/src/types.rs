use std::borrow::Borrow;
use std::fmt;

/// Name of one actor, derived as `base + name_prefix + index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(String);

impl ActorId {
	pub fn new(base: &str, name_prefix: &str, index: i64) -> Self {
		Self(format!("{base}{name_prefix}{index}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ActorId {
	fn from(name: &str) -> Self {
		Self(name.to_string())
	}
}

impl From<String> for ActorId {
	fn from(name: String) -> Self {
		Self(name)
	}
}

impl Borrow<str> for ActorId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Identifier of one submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}
