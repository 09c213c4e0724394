mod gateway_config;
mod logging_config;
mod network_config;
mod upstream_config;
pub mod config;

use clap::Parser;

pub use config::{Config, ConfigError};
pub use gateway_config::GatewayConfig;
pub use logging_config::LoggingConfig;
pub use network_config::{HttpConfig, NetworkConfig};
pub use upstream_config::{UpstreamConfig, UpstreamsConfig, WsdlSource};

/// Structure representing application startup arguments.
#[derive(Parser, Debug)]
#[command(name = "soap-gateway", about = "JSON to SOAP gateway")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", default_value = "config.toml")]
    pub config_path: String,
}
