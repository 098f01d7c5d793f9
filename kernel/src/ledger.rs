use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::LedgerError;
use crate::types::{ItemId, StateRecord};

/// Durable mapping from item identifier to a finalized [`StateRecord`].
///
/// Read-only from the kernel's perspective; elections write to it exactly
/// once, on their transition to `DONE` with a terminal outcome. The presence
/// of a record is authoritative: the kernel never re-derives or overrides it.
pub trait Ledger: Send + Sync {
	fn get_record(&self, item_id: ItemId) -> Result<Option<StateRecord>, LedgerError>;

	/// Idempotent on `(item_id, state)`.
	fn put_record(&self, record: StateRecord) -> Result<(), LedgerError>;
}

/// In-memory reference implementation standing in for a real embedded store
/// (out of scope here). Lookups never block on the kernel: the read path
/// only ever takes a shared read lock over a plain map.
#[derive(Default)]
pub struct InMemoryLedger {
	records: RwLock<HashMap<ItemId, StateRecord>>,
}

impl InMemoryLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.records.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Ledger for InMemoryLedger {
	fn get_record(&self, item_id: ItemId) -> Result<Option<StateRecord>, LedgerError> {
		Ok(self.records.read().get(&item_id).cloned())
	}

	fn put_record(&self, record: StateRecord) -> Result<(), LedgerError> {
		self.records.write().insert(record.item_id, record);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	fn record(id: ItemId, state: crate::types::ItemState) -> StateRecord {
		StateRecord { item_id: id, state, created_at: Utc::now(), expires_at: None }
	}

	#[test]
	fn miss_returns_none() {
		let ledger = InMemoryLedger::new();
		assert!(ledger.get_record(ItemId::from_bytes([1; 32])).unwrap().is_none());
	}

	#[test]
	fn put_then_get_round_trips() {
		let ledger = InMemoryLedger::new();
		let id = ItemId::from_bytes([2; 32]);
		ledger.put_record(record(id, crate::types::ItemState::Approved)).unwrap();
		let got = ledger.get_record(id).unwrap().expect("record present");
		assert_eq!(got.state, crate::types::ItemState::Approved);
	}

	#[test]
	fn put_is_idempotent_on_overwrite() {
		let ledger = InMemoryLedger::new();
		let id = ItemId::from_bytes([3; 32]);
		ledger.put_record(record(id, crate::types::ItemState::Approved)).unwrap();
		ledger.put_record(record(id, crate::types::ItemState::Approved)).unwrap();
		assert_eq!(ledger.len(), 1);
	}
}
