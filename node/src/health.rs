//! Minimal liveness endpoint: returns HTTP 200 for any request to `/health`,
//! independent of the peer transport. A process supervisor polls this to
//! decide whether to restart the node.

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::settings::HealthCheckSettings;

pub struct HealthChecker {
	listener: TcpListener,
	bind_address: String,
}

impl HealthChecker {
	pub async fn new(settings: &HealthCheckSettings) -> anyhow::Result<Self> {
		let bind_address = format!("{}:{}", settings.hostname, settings.port);
		let listener = TcpListener::bind(&bind_address)
			.await
			.with_context(|| format!("could not bind health check listener to {bind_address}"))?;
		info!(%bind_address, "health check listener bound");
		Ok(Self { listener, bind_address })
	}

	pub async fn run(self) -> anyhow::Result<()> {
		loop {
			match self.listener.accept().await {
				Ok((mut stream, _peer_addr)) => {
					let mut buffer = [0u8; 1024];
					let read = stream.read(&mut buffer).await.context("failed to read health check request")?;

					let mut headers = [httparse::EMPTY_HEADER; 16];
					let mut request = httparse::Request::new(&mut headers);
					match request.parse(&buffer[..read]) {
						Ok(_) if request.path == Some("/health") => {
							stream
								.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
								.await
								.context("failed to write health check response")?;
						},
						Ok(_) => warn!(path = ?request.path, "health check requested at unknown path"),
						Err(error) => warn!(%error, "could not parse health check request"),
					}
				},
				Err(error) => warn!(bind_address = %self.bind_address, %error, "health check accept failed"),
			}
		}
	}
}
