use tracing_subscriber::EnvFilter;

/// Initializes the process-wide `tracing` subscriber once. Falls back to
/// `info` when `RUST_LOG` is unset, matching the reference engine's default.
pub fn init() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.json()
		.try_init()
		.expect("setting default tracing subscriber failed");
}
