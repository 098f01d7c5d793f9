use std::sync::Arc;

use crate::decision::Kernel;
use crate::error::KernelError;
use crate::types::{DoneCallback, Item, ItemId, ItemInfo, ItemResult, Peer};

/// Thin local-process adapter over [`Kernel`] for a client that submits its
/// own items and polls for outcomes. Carries no state of its own; every
/// method is a direct, uncached call into the kernel.
pub struct Client<I: Item, P: Peer> {
	kernel: Arc<Kernel<I, P>>,
}

impl<I: Item, P: Peer> Client<I, P> {
	pub fn new(kernel: Arc<Kernel<I, P>>) -> Self {
		Self { kernel }
	}

	pub fn register_item(
		&self,
		item: I,
		on_done: Option<DoneCallback>,
	) -> Result<ItemInfo<I>, KernelError> {
		self.kernel.register_item(item, on_done)
	}

	/// Cheap ledger-only probe; never observes an in-flight election this
	/// client did not itself submit.
	pub fn check_item(&self, item_id: ItemId) -> Result<Option<ItemResult>, KernelError> {
		self.kernel.check_item(item_id)
	}

	pub async fn wait_for_item(&self, item_id: ItemId) -> Result<Option<ItemResult>, KernelError> {
		self.kernel.wait_for_item(item_id).await
	}

	pub fn get_item(&self, item_id: ItemId) -> Option<I> {
		self.kernel.get_item(item_id)
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use crate::ledger::InMemoryLedger;
	use crate::network::StubNetwork;
	use crate::types::ItemState;

	use super::*;

	#[derive(Clone, Debug, PartialEq, Eq, Hash)]
	struct TestPeer(u8);

	#[derive(Clone, Debug)]
	struct TestItem(ItemId);

	impl Item for TestItem {
		fn id(&self) -> ItemId {
			self.0
		}
	}

	#[tokio::test]
	async fn register_then_wait_settles_to_a_terminal_state() {
		let ledger = Arc::new(InMemoryLedger::new());
		let network = Arc::new(StubNetwork::new(vec![TestPeer(1)], Duration::from_secs(30)));
		let client = Client::new(Kernel::new(ledger, network));

		let id = ItemId::from_bytes([42; 32]);
		let info = client.register_item(TestItem(id), None).unwrap();
		assert_eq!(info.result.state, ItemState::Pending);

		let result = client.wait_for_item(id).await.unwrap().expect("election should finalize");
		assert_eq!(result.state, ItemState::Approved);

		let replayed = client.check_item(id).unwrap().expect("should now be in the ledger");
		assert_eq!(replayed.state, ItemState::Approved);
	}
}
