use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content-addressed hash identifying an item. Opaque to the kernel beyond
/// equality, hashing and ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub [u8; 32]);

impl ItemId {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}
}

impl fmt::Debug for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ItemId({})", hex::encode(&self.0[..4]))
	}
}

impl fmt::Display for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", hex::encode(self.0))
	}
}

/// An arbitrary content-addressed object the network is asked to approve.
///
/// The cryptographic item format is out of scope here; the kernel only needs
/// to be able to derive an [`ItemId`] and move the body around.
pub trait Item: Clone + Send + Sync + 'static {
	fn id(&self) -> ItemId;
}

/// Opaque remote-node identity. Addressing and authentication are the
/// network layer's problem; the kernel only needs equality and hashing so it
/// can de-duplicate votes and source nodes.
pub trait Peer: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static {}

impl<T> Peer for T where T: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static {}

/// Tagged item lifecycle state. The first three variants are non-terminal,
/// the next three are terminal (and thus ledger-persistable); `Undefined`
/// marks an item the node has no evidence about.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ItemState {
	Pending,
	PendingPositive,
	PendingNegative,
	Approved,
	Declined,
	Revoked,
	Undefined,
}

impl ItemState {
	pub fn is_terminal(self) -> bool {
		matches!(self, ItemState::Approved | ItemState::Declined | ItemState::Revoked)
	}
}

impl fmt::Display for ItemState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// A vote as registered with an election, derived from a caller's claimed
/// item state. `None` means the caller's state carries no vote (e.g.
/// `Undefined` or `Pending`).
pub fn vote_from_state(state: ItemState) -> Option<bool> {
	match state {
		ItemState::PendingPositive | ItemState::Approved => Some(true),
		ItemState::PendingNegative | ItemState::Declined | ItemState::Revoked => Some(false),
		ItemState::Pending | ItemState::Undefined => None,
	}
}

/// Durable record of a finalized item, as stored by the ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateRecord {
	pub item_id: ItemId,
	pub state: ItemState,
	pub created_at: DateTime<Utc>,
	pub expires_at: Option<DateTime<Utc>>,
}

impl StateRecord {
	pub fn pending(item_id: ItemId, created_at: DateTime<Utc>) -> Self {
		Self { item_id, state: ItemState::Pending, created_at, expires_at: None }
	}
}

/// Read-only snapshot returned from the kernel to any caller, peer or
/// client alike.
#[derive(Clone, Debug)]
pub struct ItemResult {
	pub state: ItemState,
	pub have_copy: bool,
	pub created_at: DateTime<Utc>,
	pub expires_at: Option<DateTime<Utc>>,
}

impl ItemResult {
	pub fn from_record(record: &StateRecord, have_copy: bool) -> Self {
		Self {
			state: record.state,
			have_copy,
			created_at: record.created_at,
			expires_at: record.expires_at,
		}
	}
}

/// A completion callback: invoked exactly once with the final [`ItemResult`],
/// synchronously if registered after the election already reached `DONE`.
pub type DoneCallback = Box<dyn FnOnce(ItemResult) + Send>;

/// Returned only to the local client that submitted the item: the snapshot
/// plus the item body it just handed over.
#[derive(Clone, Debug)]
pub struct ItemInfo<I: Item> {
	pub result: ItemResult,
	pub item: I,
}
