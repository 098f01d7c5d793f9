mod health;
mod item;
mod logging;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use item::OpaqueItem;
use kernel::{InMemoryLedger, Kernel, StubNetwork};
use prometheus::Registry;
use settings::{CommandLineOptions, Settings};
use tracing::{error, info};

type NodeKernel = Kernel<OpaqueItem, String>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let opts = CommandLineOptions::parse();
	let settings = Settings::new(&opts)?;

	logging::init();

	let registry = Registry::new();
	kernel::metrics::register(&registry)?;

	let ledger = Arc::new(InMemoryLedger::new());
	let network = Arc::new(StubNetwork::new(
		settings.network.peers.clone(),
		Duration::from_secs(settings.network.max_elections_time_secs),
	));
	let kernel: Arc<NodeKernel> = Kernel::new(ledger, network);

	info!(peers = settings.network.peers.len(), "decision kernel started");

	let health_checker = health::HealthChecker::new(&settings.health_check).await?;
	let health_handle = tokio::spawn(async move {
		if let Err(error) = health_checker.run().await {
			error!(%error, "health check listener exited");
		}
	});

	wait_for_shutdown_signal().await;
	info!("shutdown signal received, closing in-flight elections");
	kernel.shutdown().await;
	health_handle.abort();

	Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
	use tokio::signal::unix::{signal, SignalKind};

	let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {},
		_ = sigterm.recv() => {},
	}
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
}
