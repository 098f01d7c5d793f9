use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::types::{Item, ItemId, Peer};

/// Peer addressing, the network-wide election ceiling and a delayed-task
/// scheduler. The wire transport behind all of this is out of scope; the
/// kernel only relies on the contract below.
#[async_trait::async_trait]
pub trait Network<P: Peer, I: Item>: Send + Sync {
	/// The ceiling `T_max` used both as an election timeout and as the
	/// post-`DONE` retention window before a purge is scheduled.
	fn max_elections_time(&self) -> Duration;

	/// Enqueue `task` to run after `delay` on a shared pool. Ordering
	/// between tasks of equal delay is unspecified.
	fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>);

	fn peers(&self) -> Vec<P>;

	fn size(&self) -> usize;

	/// Availability primitive surfaced to clients; unused by the decision
	/// kernel itself.
	fn check_state(&self, reporter: &P) -> usize;

	/// Retrieve a missing item body from a claimed source node. Resolves to
	/// `None` if the peer doesn't have it, is unreachable, or the fetch
	/// otherwise fails; the election treats that as late-download.
	async fn fetch_item(&self, peer: &P, item_id: ItemId) -> Option<I>;
}

/// Reference network implementation standing in for the real peer-to-peer
/// transport. Peers and election-ceiling are static; `schedule` runs tasks
/// on the Tokio runtime; `fetch_item` is backed by an in-memory catalogue
/// tests can populate to simulate a peer that does (or doesn't) have a copy.
pub struct StubNetwork<P: Peer, I: Item> {
	peers: Vec<P>,
	max_elections_time: Duration,
	catalogue: RwLock<HashMap<ItemId, I>>,
}

impl<P: Peer, I: Item> StubNetwork<P, I> {
	pub fn new(peers: Vec<P>, max_elections_time: Duration) -> Self {
		Self { peers, max_elections_time, catalogue: RwLock::new(HashMap::new()) }
	}

	/// Make `item` fetchable from any peer, as if some source node held it.
	pub fn seed_item(&self, item: I) {
		self.catalogue.write().insert(item.id(), item);
	}
}

#[async_trait::async_trait]
impl<P: Peer, I: Item> Network<P, I> for StubNetwork<P, I> {
	fn max_elections_time(&self) -> Duration {
		self.max_elections_time
	}

	fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) {
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			task.await;
		});
	}

	fn peers(&self) -> Vec<P> {
		self.peers.clone()
	}

	fn size(&self) -> usize {
		self.peers.len()
	}

	fn check_state(&self, _reporter: &P) -> usize {
		self.peers.len()
	}

	async fn fetch_item(&self, _peer: &P, item_id: ItemId) -> Option<I> {
		self.catalogue.read().get(&item_id).cloned()
	}
}

#[cfg(test)]
mod tests {
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
	async fn fetch_misses_until_seeded() {
		let net: StubNetwork<TestPeer, TestItem> =
			StubNetwork::new(vec![TestPeer(1)], Duration::from_secs(5));
		let id = ItemId::from_bytes([9; 32]);
		assert!(net.fetch_item(&TestPeer(1), id).await.is_none());
		net.seed_item(TestItem(id));
		assert!(net.fetch_item(&TestPeer(1), id).await.is_some());
	}

	#[tokio::test]
	async fn schedule_runs_after_delay() {
		let net: StubNetwork<TestPeer, TestItem> = StubNetwork::new(vec![], Duration::from_secs(5));
		let (tx, rx) = tokio::sync::oneshot::channel();
		net.schedule(Duration::from_millis(10), Box::pin(async move { tx.send(()).unwrap() }));
		rx.await.unwrap();
	}
}
