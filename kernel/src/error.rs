use thiserror::Error;

/// Errors surfaced by the ledger collaborator. The kernel only ever treats a
/// ledger miss as "absent record" when the store itself signals not-found;
/// anything else is a transient failure that must reach the caller.
#[derive(Error, Debug)]
pub enum LedgerError {
	#[error("ledger I/O error: {0}")]
	Io(String),
}

/// Errors raised by an election before it ever reaches `STARTED`, e.g. an
/// unrecoverable failure during the initial item check.
#[derive(Error, Debug)]
pub enum ElectionError {
	#[error("item check failed: {0}")]
	ItemCheckFailed(String),
}

/// Top-level kernel error. The peer-facing entry point (`check_item`) never
/// propagates these; it logs and returns a `Pending` snapshot instead. The
/// client-facing `register_item_and_wait` path does propagate them.
#[derive(Error, Debug)]
pub enum KernelError {
	#[error(transparent)]
	Ledger(#[from] LedgerError),

	#[error(transparent)]
	Election(#[from] ElectionError),

	#[error("wait for item was interrupted")]
	Interrupted,

	#[error("invariant violation: {0}")]
	InvariantViolation(String),
}
