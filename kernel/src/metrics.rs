//! Process-wide gauges, mirroring the reference engine's per-ceremony
//! authorized/unauthorized counters.
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntGauge};

lazy_static! {
	pub static ref ELECTIONS_ACTIVE: IntGauge = IntGauge::new(
		"kernel_elections_active",
		"Number of elections currently tracked in the elections map"
	)
	.unwrap();
	pub static ref ELECTIONS_CREATED_TOTAL: IntCounter = IntCounter::new(
		"kernel_elections_created_total",
		"Total number of elections ever created"
	)
	.unwrap();
	pub static ref ELECTIONS_TIMED_OUT_TOTAL: IntCounter = IntCounter::new(
		"kernel_elections_timed_out_total",
		"Total number of elections that reached T_max without quorum"
	)
	.unwrap();
}

/// Register all kernel metrics with the given registry. Safe to call once
/// per process; the node binary does this at startup before serving `/metrics`.
pub fn register(registry: &prometheus::Registry) -> prometheus::Result<()> {
	registry.register(Box::new(ELECTIONS_ACTIVE.clone()))?;
	registry.register(Box::new(ELECTIONS_CREATED_TOTAL.clone()))?;
	registry.register(Box::new(ELECTIONS_TIMED_OUT_TOTAL.clone()))?;
	Ok(())
}
