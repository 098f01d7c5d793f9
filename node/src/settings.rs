use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkSettings {
	/// Static peer set, expanded later into real addressed connections by
	/// the transport layer (out of scope here).
	pub peers: Vec<String>,
	/// `T_max` in seconds: both the election timeout and the post-`DONE`
	/// retention window before a purge is scheduled.
	pub max_elections_time_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthCheckSettings {
	pub hostname: String,
	pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
	pub network: NetworkSettings,
	pub health_check: HealthCheckSettings,
}

impl Settings {
	/// Layers, lowest to highest precedence: built-in defaults, an optional
	/// `config/default.toml`, the `NODE__` prefixed environment, then the
	/// parsed command-line flags.
	pub fn new(opts: &CommandLineOptions) -> Result<Self, ConfigError> {
		let mut builder = Config::builder()
			.set_default("network.peers", Vec::<String>::new())?
			.set_default("network.max_elections_time_secs", 30u64)?
			.set_default("health_check.hostname", "127.0.0.1")?
			.set_default("health_check.port", 5555)?
			.add_source(File::with_name("config/default").required(false))
			.add_source(Environment::with_prefix("node").separator("__"));

		if let Some(ref peers) = opts.peers {
			builder = builder.set_override("network.peers", peers.clone())?;
		}
		if let Some(secs) = opts.max_elections_time_secs {
			builder = builder.set_override("network.max_elections_time_secs", secs as i64)?;
		}
		if let Some(ref hostname) = opts.health_hostname {
			builder = builder.set_override("health_check.hostname", hostname.clone())?;
		}
		if let Some(port) = opts.health_port {
			builder = builder.set_override("health_check.port", port as i64)?;
		}

		builder.build()?.try_deserialize()
	}
}

#[derive(Parser, Debug, Clone, Default)]
#[clap(about = "Local node decision kernel")]
pub struct CommandLineOptions {
	#[clap(long = "network.peers", value_delimiter = ',')]
	pub peers: Option<Vec<String>>,
	#[clap(long = "network.max_elections_time_secs")]
	pub max_elections_time_secs: Option<u64>,
	#[clap(long = "health_check.hostname")]
	pub health_hostname: Option<String>,
	#[clap(long = "health_check.port")]
	pub health_port: Option<u16>,
}
