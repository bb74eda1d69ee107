use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::TaskClass;

/// Snapshot of one registered unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
	pub id: u64,
	pub label: String,
	pub class: TaskClass,
	pub completed: usize,
	pub total: usize,
}

/// In-memory registry of running work for status snapshots.
#[derive(Debug, Default, Clone)]
pub struct WorkerRegistry {
	inner: Arc<RwLock<BTreeMap<u64, WorkerRecord>>>,
}

impl WorkerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Upserts one record.
	pub fn upsert(&self, record: WorkerRecord) {
		if let Ok(mut guard) = self.inner.write() {
			guard.insert(record.id, record);
		}
	}

	/// Records one more completed step for `id`.
	pub fn advance(&self, id: u64) {
		if let Ok(mut guard) = self.inner.write()
			&& let Some(record) = guard.get_mut(&id)
		{
			record.completed = record.completed.saturating_add(1).min(record.total);
		}
	}

	/// Removes one record.
	pub fn remove(&self, id: u64) {
		if let Ok(mut guard) = self.inner.write() {
			guard.remove(&id);
		}
	}

	/// Returns snapshots ordered by id.
	pub fn snapshots(&self) -> Vec<WorkerRecord> {
		let Ok(guard) = self.inner.read() else {
			return Vec::new();
		};
		guard.values().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(id: u64, total: usize) -> WorkerRecord {
		WorkerRecord {
			id,
			label: format!("batch {id}"),
			class: TaskClass::Batch,
			completed: 0,
			total,
		}
	}

	#[test]
	fn advance_saturates_at_total() {
		let registry = WorkerRegistry::new();
		registry.upsert(record(1, 2));
		for _ in 0..5 {
			registry.advance(1);
		}
		assert_eq!(registry.snapshots()[0].completed, 2);
	}

	#[test]
	fn snapshots_are_ordered_and_removal_sticks() {
		let registry = WorkerRegistry::new();
		registry.upsert(record(3, 1));
		registry.upsert(record(1, 1));
		registry.upsert(record(2, 1));
		registry.remove(2);
		let ids: Vec<_> = registry.snapshots().iter().map(|r| r.id).collect();
		assert_eq!(ids, vec![1, 3]);
	}
}
