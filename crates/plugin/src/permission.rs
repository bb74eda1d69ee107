use crate::source::CommandSource;

/// Minimum permission level for every `!!plb` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionGate {
	required: u32,
}

impl PermissionGate {
	pub const fn new(required: u32) -> Self {
		Self { required }
	}

	pub const fn required(&self) -> u32 {
		self.required
	}

	pub fn allows(&self, source: &dyn CommandSource) -> bool {
		source.permission_level() >= self.required
	}
}
