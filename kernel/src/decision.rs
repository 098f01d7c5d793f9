
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{info_span, warn};

use crate::election::{Election, ItemOrId};
use crate::error::KernelError;
use crate::ledger::Ledger;
use crate::network::Network;
use crate::types::{vote_from_state, DoneCallback, Item, ItemId, ItemInfo, ItemResult, ItemState, Peer};

/// The re-entrant, thread-safe dispatcher that routes every incoming query
/// to either a ledger lookup or an election, creating elections atomically.
///
/// `check_lock` is held only for the map check-and-insert in
/// [`Kernel::process_check_item`]'s slow path; it never guards I/O or user
/// callbacks. Election internals carry their own synchronization.
pub struct Kernel<I: Item, P: Peer> {
	elections: DashMap<ItemId, Arc<Election<I, P>>>,
	check_lock: Mutex<()>,
	ledger: Arc<dyn Ledger>,
	network: Arc<dyn Network<P, I>>,
}

impl<I: Item, P: Peer> Kernel<I, P> {
	pub fn new(ledger: Arc<dyn Ledger>, network: Arc<dyn Network<P, I>>) -> Arc<Self> {
		Arc::new(Self { elections: DashMap::new(), check_lock: Mutex::new(()), ledger, network })
	}

	/// Single entry point described in §4.4. Total: every input combination
	/// returns a synchronous [`ItemResult`] snapshot, except for an
	/// `item.id != item_id` mismatch, which is a programming error.
	pub fn process_check_item(
		self: &Arc<Self>,
		caller: Option<P>,
		item_id: ItemId,
		caller_state: Option<ItemState>,
		caller_has_copy: bool,
		item: Option<I>,
		on_done: Option<DoneCallback>,
	) -> Result<ItemResult, KernelError> {
		let _span = info_span!("process_check_item", item_id = %item_id).entered();

		// 1. Fast path: a live election already exists.
		if let Some(election) = self.elections.get(&item_id).map(|entry| Arc::clone(entry.value())) {
			return Ok(self.attach(&election, caller, caller_state, caller_has_copy, on_done));
		}

		// 2. Ledger lookup: a terminal record is authoritative.
		if let Some(record) = self.ledger.get_record(item_id)? {
			let result = ItemResult::from_record(&record, false);
			if let Some(callback) = on_done {
				callback(result.clone());
			}
			return Ok(result);
		}

		if let Some(ref body) = item {
			if body.id() != item_id {
				return Err(KernelError::InvariantViolation(format!(
					"item.id ({}) does not match item_id ({item_id})",
					body.id()
				)));
			}
		}

		// 3. Slow path: create-or-find under the single process-wide lock.
		let (election, just_created) = {
			let _guard = self.check_lock.lock();
			if let Some(existing) = self.elections.get(&item_id) {
				(Arc::clone(existing.value()), false)
			} else {
				let item_or_id =
					match item.clone() { Some(body) => ItemOrId::Body(body), None => ItemOrId::Id(item_id) };
				let election = Election::new(Arc::clone(&self.ledger), Arc::clone(&self.network), item_or_id);
				self.elections.insert(item_id, Arc::clone(&election));
				(election, true)
			}
		};

		// 4. Start + schedule purge, outside the mutex.
		if just_created {
			election.ensure_started();
			self.schedule_purge(item_id, &election);
		}

		// 5 & 6. Vote/source registration, observer attachment, snapshot.
		Ok(self.attach(&election, caller, caller_state, caller_has_copy, on_done))
	}

	fn attach(
		&self,
		election: &Arc<Election<I, P>>,
		caller: Option<P>,
		caller_state: Option<ItemState>,
		caller_has_copy: bool,
		on_done: Option<DoneCallback>,
	) -> ItemResult {
		if let Some(peer) = caller {
			if caller_has_copy {
				election.add_source_node(peer.clone());
			}
			if let Some(state) = caller_state {
				if let Some(vote) = vote_from_state(state) {
					election.register_vote(peer, vote);
				}
			}
		}

		if let Some(callback) = on_done {
			election.on_done(move |result| callback(result));
		}

		ItemResult::from_record(&election.get_record(), election.get_item().is_some())
	}

	/// Registers a one-shot observer that, once the election reaches `DONE`,
	/// schedules the map entry's removal `T_max` later — giving late peer
	/// queries a grace window in which they still observe the result.
	fn schedule_purge(self: &Arc<Self>, item_id: ItemId, election: &Arc<Election<I, P>>) {
		let kernel = Arc::clone(self);
		let election = Arc::clone(election);
		let network = Arc::clone(&self.network);

		election.on_done(move |_result| {
			let delay = network.max_elections_time();
			let task: BoxFuture<'static, ()> =
				Box::pin(async move { kernel.purge_if_current(item_id, &election) });
			network.schedule(delay, task);
		});
	}

	fn purge_if_current(&self, item_id: ItemId, election: &Arc<Election<I, P>>) {
		let current = self.elections.get(&item_id).map(|entry| Arc::ptr_eq(entry.value(), election));
		if current == Some(true) {
			self.elections.remove(&item_id);
		}
	}

	// ---- Client-facing operations (§4.5) ----

	pub fn register_item(
		self: &Arc<Self>,
		item: I,
		on_done: Option<DoneCallback>,
	) -> Result<ItemInfo<I>, KernelError> {
		let item_id = item.id();
		let result = self.process_check_item(None, item_id, None, false, Some(item.clone()), on_done)?;
		Ok(ItemInfo { result, item })
	}

	/// Cheap probe: consults only the ledger, never the elections map, and
	/// never creates an election. A live in-flight election for `item_id`
	/// that this caller did not itself start is invisible to this call.
	pub fn check_item(&self, item_id: ItemId) -> Result<Option<ItemResult>, KernelError> {
		Ok(self.ledger.get_record(item_id)?.map(|record| ItemResult::from_record(&record, false)))
	}

	/// Not exposed to remote peers. Blocks on the live election's
	/// completion if one exists, otherwise falls back to the ledger.
	pub async fn wait_for_item(&self, item_id: ItemId) -> Result<Option<ItemResult>, KernelError> {
		let election = self.elections.get(&item_id).map(|entry| Arc::clone(entry.value()));
		if let Some(election) = election {
			election.wait_done().await;
			return Ok(Some(ItemResult::from_record(&election.get_record(), election.get_item().is_some())));
		}
		Ok(self.ledger.get_record(item_id)?.map(|record| ItemResult::from_record(&record, false)))
	}

	pub fn get_item(&self, item_id: ItemId) -> Option<I> {
		self.elections.get(&item_id).and_then(|entry| entry.value().get_item())
	}

	/// Closes every live election. Does not wait for their scheduled purges.
	pub async fn shutdown(&self) {
		let live: Vec<Arc<Election<I, P>>> =
			self.elections.iter().map(|entry| Arc::clone(entry.value())).collect();
		for election in live {
			election.close().await;
		}
	}

	// ---- Peer-facing entry point (§6) ----

	/// The peer-to-peer `check_item` entry. Unlike the client probe above,
	/// this one drives the full decision algorithm and may create an
	/// election. Errors are logged and folded into a `Pending` snapshot
	/// rather than propagated to the remote peer.
	pub fn check_item_from_peer(
		self: &Arc<Self>,
		caller: P,
		item_id: ItemId,
		caller_state: Option<ItemState>,
		caller_has_copy: bool,
	) -> ItemResult {
		match self.process_check_item(Some(caller), item_id, caller_state, caller_has_copy, None, None) {
			Ok(result) => result,
			Err(error) => {
				warn!(%item_id, %error, "check_item from peer failed, returning pending");
				ItemResult { state: ItemState::Pending, have_copy: false, created_at: Utc::now(), expires_at: None }
			},
		}
	}
}
