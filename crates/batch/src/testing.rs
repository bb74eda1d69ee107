//! Test doubles for the host and requester seams.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::HostError;
use crate::host::{ReplyKind, Requester, ServerHost};

/// Host that records every successfully executed command.
#[derive(Default)]
pub(crate) struct RecordingHost {
	commands: Mutex<Vec<String>>,
	online: Mutex<BTreeSet<String>>,
	fail_containing: Mutex<Option<String>>,
	listing_fails: AtomicBool,
	list_calls: AtomicUsize,
}

impl RecordingHost {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn commands(&self) -> Vec<String> {
		self.commands.lock().clone()
	}

	pub(crate) fn count_containing(&self, needle: &str) -> usize {
		self.commands.lock().iter().filter(|c| c.contains(needle)).count()
	}

	pub(crate) fn set_online(&self, names: &[&str]) {
		*self.online.lock() = names.iter().map(|n| n.to_string()).collect();
	}

	pub(crate) fn fail_commands_containing(&self, needle: &str) {
		*self.fail_containing.lock() = Some(needle.to_string());
	}

	pub(crate) fn fail_listing(&self) {
		self.listing_fails.store(true, Ordering::SeqCst);
	}

	pub(crate) fn list_calls(&self) -> usize {
		self.list_calls.load(Ordering::SeqCst)
	}
}

impl ServerHost for RecordingHost {
	fn execute(&self, command: &str) -> Result<(), HostError> {
		if let Some(needle) = self.fail_containing.lock().as_deref()
			&& command.contains(needle)
		{
			return Err(HostError::new(format!("rejected: {command}")));
		}
		self.commands.lock().push(command.to_string());
		Ok(())
	}

	fn online_actors(&self) -> Result<BTreeSet<String>, HostError> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);
		if self.listing_fails.load(Ordering::SeqCst) {
			return Err(HostError::new("list unavailable"));
		}
		Ok(self.online.lock().clone())
	}
}

/// Requester that keeps every reply.
#[derive(Default)]
pub(crate) struct RecordingRequester {
	replies: Mutex<Vec<(ReplyKind, String)>>,
}

impl RecordingRequester {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn replies(&self) -> Vec<(ReplyKind, String)> {
		self.replies.lock().clone()
	}
}

impl Requester for RecordingRequester {
	fn reply(&self, kind: ReplyKind, message: &str) {
		self.replies.lock().push((kind, message.to_string()));
	}
}
