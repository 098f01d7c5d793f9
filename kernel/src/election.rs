#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ledger::Ledger;
use crate::metrics;
use crate::network::Network;
use crate::types::{DoneCallback, Item, ItemId, ItemResult, ItemState, Peer, StateRecord};

/// Either a full item body (the submitter already has it) or just its id (a
/// peer mentioned it and the body must be fetched from a source node).
pub enum ItemOrId<I: Item> {
	Body(I),
	Id(ItemId),
}

impl<I: Item> ItemOrId<I> {
	fn id(&self) -> ItemId {
		match self {
			ItemOrId::Body(item) => item.id(),
			ItemOrId::Id(id) => *id,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	Created,
	Started,
	Deciding,
	Done,
}

struct Inner<I: Item, P: Peer> {
	phase: Phase,
	item: Option<I>,
	sources: HashSet<P>,
	votes: HashMap<P, bool>,
	/// Implicit vote derived from the submitter handing over the item body
	/// directly: `ensure_started`'s initial check is treated as having
	/// passed for the node's own copy.
	local_vote: Option<bool>,
	observers: Vec<DoneCallback>,
	record: StateRecord,
}

/// Per-item voting process that decides an item's terminal state.
///
/// The quorum algorithm itself is a black box from the decision kernel's
/// point of view (§4.3); this implementation instantiates it as: quorum is a
/// majority of `network.size()` (floor 1), ties/no-evidence at `T_max` fall
/// back to `DECLINED` if any negative vote was seen, else `UNDEFINED`.
pub struct Election<I: Item, P: Peer> {
	item_id: ItemId,
	ledger: Arc<dyn Ledger>,
	network: Arc<dyn Network<P, I>>,
	inner: Mutex<Inner<I, P>>,
	/// Wakes the run loop when a vote, source or item body changes.
	progress: Notify,
	/// Wakes external `wait_done` callers on the `DONE` transition.
	done: Notify,
	task: Mutex<Option<JoinHandle<()>>>,
	emulate_late_download: AtomicBool,
}

impl<I: Item, P: Peer> Election<I, P> {
	pub fn new(
		ledger: Arc<dyn Ledger>,
		network: Arc<dyn Network<P, I>>,
		item_or_id: ItemOrId<I>,
	) -> Arc<Self> {
		let item_id = item_or_id.id();
		let (item, local_vote) = match item_or_id {
			ItemOrId::Body(item) => (Some(item), Some(true)),
			ItemOrId::Id(_) => (None, None),
		};

		metrics::ELECTIONS_CREATED_TOTAL.inc();
		metrics::ELECTIONS_ACTIVE.inc();

		Arc::new(Self {
			item_id,
			ledger,
			network,
			inner: Mutex::new(Inner {
				phase: Phase::Created,
				item,
				sources: HashSet::new(),
				votes: HashMap::new(),
				local_vote,
				observers: Vec::new(),
				record: StateRecord::pending(item_id, Utc::now()),
			}),
			progress: Notify::new(),
			done: Notify::new(),
			task: Mutex::new(None),
			emulate_late_download: AtomicBool::new(false),
		})
	}

	/// Testing switch: force the election to behave as though the item body
	/// could never be retrieved, even if a source node has it.
	pub fn set_emulate_late_download(&self, on: bool) {
		self.emulate_late_download.store(on, AtomicOrdering::Relaxed);
	}

	pub fn item_id(&self) -> ItemId {
		self.item_id
	}

	/// Idempotent; transitions `CREATED -> STARTED` and spawns the
	/// background task that drives the election to `DONE`. Must be called
	/// outside the kernel's `check_lock`, since the initial item check it
	/// triggers may be lengthy.
	pub fn ensure_started(self: &Arc<Self>) {
		{
			let mut inner = self.inner.lock();
			if inner.phase != Phase::Created {
				return;
			}
			inner.phase = Phase::Started;
		}

		let this = Arc::clone(self);
		let handle = tokio::spawn(async move { this.run().await });
		*self.task.lock() = Some(handle);
	}

	pub fn add_source_node(&self, peer: P) {
		let mut inner = self.inner.lock();
		if inner.phase == Phase::Done {
			return;
		}
		inner.sources.insert(peer);
		drop(inner);
		self.progress.notify_one();
	}

	/// First-write-wins: a second vote from the same peer is ignored, and
	/// any vote arriving after `DONE` is silently dropped.
	pub fn register_vote(&self, peer: P, positive: bool) {
		let mut inner = self.inner.lock();
		if inner.phase == Phase::Done {
			return;
		}
		if let std::collections::hash_map::Entry::Vacant(e) = inner.votes.entry(peer) {
			e.insert(positive);
			drop(inner);
			self.progress.notify_one();
		}
	}

	/// If the election already reached `DONE`, invokes `callback`
	/// synchronously with the cached result. Otherwise it is appended to the
	/// observer list and invoked exactly once, after `DONE`.
	pub fn on_done(&self, callback: impl FnOnce(ItemResult) + Send + 'static) {
		let mut inner = self.inner.lock();
		if inner.phase == Phase::Done {
			let result = ItemResult::from_record(&inner.record, inner.item.is_some());
			drop(inner);
			callback(result);
		} else {
			inner.observers.push(Box::new(callback));
		}
	}

	pub fn get_item(&self) -> Option<I> {
		self.inner.lock().item.clone()
	}

	pub fn get_record(&self) -> StateRecord {
		self.inner.lock().record.clone()
	}

	fn is_done(&self) -> bool {
		self.inner.lock().phase == Phase::Done
	}

	/// Blocks until `DONE`. Dropping the returned future cancels the wait
	/// without affecting the election's own progress.
	pub async fn wait_done(&self) {
		loop {
			let notified = self.done.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			if self.is_done() {
				return;
			}
			notified.await;
		}
	}

	/// Forces an immediate transition to `DONE` with whatever record is
	/// current (which may still be non-terminal), invoking observers once.
	/// Used by `Kernel::shutdown`.
	pub async fn close(self: &Arc<Self>) {
		if let Some(handle) = self.task.lock().take() {
			handle.abort();
		}
		self.complete(None).await;
	}

	async fn run(self: Arc<Self>) {
		self.maybe_fetch_item().await;

		{
			let mut inner = self.inner.lock();
			if inner.phase != Phase::Done {
				inner.phase = Phase::Deciding;
			}
		}

		let deadline = tokio::time::Instant::now() + self.network.max_elections_time();

		loop {
			if self.is_done() {
				return;
			}

			if let Some(state) = self.evaluate_quorum() {
				self.complete(Some(state)).await;
				return;
			}

			let notified = self.progress.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			tokio::select! {
				_ = tokio::time::sleep_until(deadline) => {
					metrics::ELECTIONS_TIMED_OUT_TOTAL.inc();
					let state = self.best_effort_state();
					self.complete(Some(state)).await;
					return;
				}
				_ = notified => {
					if self.get_item().is_none() {
						self.maybe_fetch_item().await;
					}
				}
			}
		}
	}

	async fn maybe_fetch_item(&self) {
		if self.emulate_late_download.load(AtomicOrdering::Relaxed) {
			return;
		}
		if self.get_item().is_some() {
			return;
		}
		let sources: Vec<P> = self.inner.lock().sources.iter().cloned().collect();
		for peer in sources {
			if let Some(item) = self.network.fetch_item(&peer, self.item_id).await {
				let mut inner = self.inner.lock();
				if inner.item.is_none() {
					inner.local_vote = Some(true);
					inner.item = Some(item);
				}
				return;
			}
		}
	}

	fn quorum_size(&self) -> usize {
		(self.network.size() / 2 + 1).max(1)
	}

	fn tally(&self) -> (usize, usize) {
		let inner = self.inner.lock();
		let mut positive = inner.votes.values().filter(|v| **v).count();
		let mut negative = inner.votes.values().filter(|v| !**v).count();
		match inner.local_vote {
			Some(true) => positive += 1,
			Some(false) => negative += 1,
			None => {},
		}
		(positive, negative)
	}

	fn evaluate_quorum(&self) -> Option<ItemState> {
		let (positive, negative) = self.tally();
		let quorum = self.quorum_size();
		if positive >= quorum {
			Some(ItemState::Approved)
		} else if negative >= quorum {
			Some(ItemState::Declined)
		} else {
			None
		}
	}

	fn best_effort_state(&self) -> ItemState {
		let (positive, negative) = self.tally();
		match positive.cmp(&negative) {
			Ordering::Greater => ItemState::Approved,
			Ordering::Less => ItemState::Declined,
			Ordering::Equal if negative > 0 => ItemState::Declined,
			Ordering::Equal => ItemState::Undefined,
		}
	}

	/// Finalizes the election. `new_state` is `Some` when coming from the
	/// run loop's own decision, `None` when forced by `close()` (which keeps
	/// whatever state the record already carries).
	async fn complete(self: &Arc<Self>, new_state: Option<ItemState>) {
		let (result, observers, record_to_persist) = {
			let mut inner = self.inner.lock();
			if inner.phase == Phase::Done {
				return;
			}
			inner.phase = Phase::Done;
			if let Some(state) = new_state {
				inner.record.state = state;
				if state.is_terminal() {
					inner.record.expires_at = Some(
						inner.record.created_at
							+ chrono::Duration::from_std(self.network.max_elections_time())
								.unwrap_or_else(|_| chrono::Duration::zero()),
					);
				}
			}
			let result = ItemResult::from_record(&inner.record, inner.item.is_some());
			let observers = std::mem::take(&mut inner.observers);
			let record_to_persist = inner.record.state.is_terminal().then(|| inner.record.clone());
			(result, observers, record_to_persist)
		};

		self.done.notify_waiters();
		metrics::ELECTIONS_ACTIVE.dec();

		if let Some(record) = record_to_persist {
			if let Err(error) = self.ledger.put_record(record) {
				warn!(item_id = %self.item_id, %error, "failed to persist finalized item");
			}
		}

		debug!(item_id = %self.item_id, state = %result.state, "election reached DONE");
		for observer in observers {
			observer(result.clone());
		}
	}
}
