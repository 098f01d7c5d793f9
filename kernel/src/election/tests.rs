use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ledger::InMemoryLedger;
use crate::network::StubNetwork;
use crate::types::{Item, ItemId, ItemState};

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

fn item_id(byte: u8) -> ItemId {
	ItemId::from_bytes([byte; 32])
}

fn new_election(
	peers: Vec<TestPeer>,
	max_elections_time: Duration,
	item_or_id: ItemOrId<TestItem>,
) -> (Arc<Election<TestItem, TestPeer>>, Arc<InMemoryLedger>, Arc<StubNetwork<TestPeer, TestItem>>) {
	let ledger = Arc::new(InMemoryLedger::new());
	let network = Arc::new(StubNetwork::new(peers, max_elections_time));
	let election = Election::new(ledger.clone(), network.clone(), item_or_id);
	(election, ledger, network)
}

#[tokio::test]
async fn reaches_approved_once_quorum_of_positive_votes_arrive() {
	let id = item_id(1);
	let (election, _ledger, _network) = new_election(
		vec![TestPeer(1), TestPeer(2), TestPeer(3)],
		Duration::from_secs(30),
		ItemOrId::Body(TestItem(id)),
	);
	election.ensure_started();

	election.register_vote(TestPeer(1), true);
	election.register_vote(TestPeer(2), true);

	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should finish quickly");
	assert_eq!(election.get_record().state, ItemState::Approved);
}

#[tokio::test]
async fn reaches_declined_once_quorum_of_negative_votes_arrive() {
	let id = item_id(2);
	let (election, _ledger, _network) = new_election(
		vec![TestPeer(1), TestPeer(2), TestPeer(3)],
		Duration::from_secs(30),
		ItemOrId::Body(TestItem(id)),
	);
	election.ensure_started();

	// Local vote (submitter's own copy) counts positive, so two more
	// negatives are needed to out-tally it for this quorum size.
	election.register_vote(TestPeer(1), false);
	election.register_vote(TestPeer(2), false);

	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should finish quickly");
	assert_eq!(election.get_record().state, ItemState::Declined);
}

#[tokio::test]
async fn times_out_to_best_effort_state_without_quorum() {
	let id = item_id(3);
	let (election, _ledger, _network) = new_election(
		vec![TestPeer(1), TestPeer(2), TestPeer(3), TestPeer(4), TestPeer(5)],
		Duration::from_millis(20),
		ItemOrId::Body(TestItem(id)),
	);
	election.ensure_started();
	election.register_vote(TestPeer(1), true);

	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should time out quickly");
	// Two positives (local + peer 1) against zero negatives: best effort is Approved.
	assert_eq!(election.get_record().state, ItemState::Approved);
}

#[tokio::test]
async fn timeout_with_no_evidence_resolves_undefined() {
	let id = item_id(4);
	let (election, _ledger, _network) = new_election(
		vec![TestPeer(1), TestPeer(2), TestPeer(3)],
		Duration::from_millis(20),
		ItemOrId::Id(id),
	);
	election.ensure_started();

	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should time out quickly");
	assert_eq!(election.get_record().state, ItemState::Undefined);
}

#[tokio::test]
async fn late_download_is_fetched_from_a_registered_source() {
	let id = item_id(5);
	let (election, _ledger, network) =
		new_election(vec![TestPeer(1)], Duration::from_secs(30), ItemOrId::Id(id));
	network.seed_item(TestItem(id));
	election.ensure_started();

	assert!(election.get_item().is_none());
	election.add_source_node(TestPeer(1));

	// Registering the source nudges the run loop to retry the fetch.
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert!(election.get_item().is_some());
}

#[tokio::test]
async fn emulated_late_download_never_fetches_even_with_a_source() {
	let id = item_id(6);
	let (election, _ledger, network) =
		new_election(vec![TestPeer(1)], Duration::from_millis(20), ItemOrId::Id(id));
	network.seed_item(TestItem(id));
	election.set_emulate_late_download(true);
	election.ensure_started();
	election.add_source_node(TestPeer(1));

	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should time out quickly");
	assert!(election.get_item().is_none());
}

#[tokio::test]
async fn on_done_fires_exactly_once_whether_registered_before_or_after_completion() {
	let id = item_id(7);
	let (election, _ledger, _network) = new_election(
		vec![TestPeer(1), TestPeer(2)],
		Duration::from_secs(30),
		ItemOrId::Body(TestItem(id)),
	);
	let before_calls = Arc::new(AtomicUsize::new(0));
	let before_calls_clone = before_calls.clone();
	election.on_done(move |_result| {
		before_calls_clone.fetch_add(1, Ordering::SeqCst);
	});

	election.ensure_started();
	election.register_vote(TestPeer(1), true);
	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should finish quickly");

	let after_calls = Arc::new(AtomicUsize::new(0));
	let after_calls_clone = after_calls.clone();
	election.on_done(move |_result| {
		after_calls_clone.fetch_add(1, Ordering::SeqCst);
	});

	assert_eq!(before_calls.load(Ordering::SeqCst), 1);
	assert_eq!(after_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_forces_done_without_a_terminal_outcome() {
	let id = item_id(8);
	let (election, ledger, _network) =
		new_election(vec![TestPeer(1), TestPeer(2)], Duration::from_secs(30), ItemOrId::Id(id));
	election.ensure_started();

	election.close().await;

	assert_eq!(election.get_record().state, ItemState::Pending);
	assert!(ledger.get_record(id).unwrap().is_none());
}

#[tokio::test]
async fn second_vote_from_same_peer_is_ignored() {
	let id = item_id(9);
	let (election, _ledger, _network) = new_election(
		vec![TestPeer(1), TestPeer(2), TestPeer(3), TestPeer(4), TestPeer(5)],
		Duration::from_millis(20),
		ItemOrId::Id(id),
	);
	election.ensure_started();
	election.register_vote(TestPeer(1), true);
	election.register_vote(TestPeer(1), false);

	tokio::time::timeout(Duration::from_secs(1), election.wait_done()).await.expect("should time out quickly");
	// Only the first (positive) vote from peer 1 should count.
	assert_eq!(election.get_record().state, ItemState::Approved);
}
