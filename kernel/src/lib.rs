//! Local node decision kernel: a re-entrant, thread-safe dispatcher that
//! resolves agreement on submitted items through multi-node voting
//! ("elections"), backed by a durable ledger of finalized states.
//!
//! The wire transport to peers, the persistent ledger backend and the
//! cryptographic item format are all external collaborators; this crate only
//! specifies the contracts it depends on ([`Ledger`], [`Network`]) and the
//! state machines that drive them ([`Election`], [`Kernel`]).

pub mod client;
pub mod decision;
pub mod election;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod network;
pub mod types;

pub use client::Client;
pub use decision::Kernel;
pub use election::{Election, ItemOrId};
pub use error::{ElectionError, KernelError, LedgerError};
pub use ledger::{InMemoryLedger, Ledger};
pub use network::{Network, StubNetwork};
pub use types::{DoneCallback, Item, ItemId, ItemInfo, ItemResult, ItemState, Peer, StateRecord};
