pub mod adapters;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod soap;
pub mod upstream;

use crate::adapters::http::{build_gateway_router, GatewayState, HttpAdapter};
use crate::adapters::ProtocolAdapter;
use crate::config::Config;
use crate::upstream::{spawn_provisioning, UpstreamHandle};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `gateway.log_level` when set.
pub fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.gateway.log_level));

    let stdout_layer = fmt::layer().with_file(true).with_line_number(true);

    let file_layer = if config.logging.log_to_file {
        let file = std::fs::File::create(&config.logging.log_file_path).with_context(|| {
            format!(
                "Failed to create log file '{}'",
                config.logging.log_file_path
            )
        })?;
        Some(
            fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Emits config warnings once a subscriber is installed.
fn log_startup_warnings(config: &Config) {
    for warning in config.startup_warnings() {
        tracing::warn!("{}", warning);
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    init_logging(&config)?;

    tracing::info!("🔧 Starting SOAP gateway '{}'", config.gateway.id);
    log_startup_warnings(&config);

    // Clients are built in the background; requests arriving before then
    // are answered as unavailable.
    let shipping = Arc::new(UpstreamHandle::new("shipping"));
    let tracking = Arc::new(UpstreamHandle::new("tracking"));
    spawn_provisioning(shipping.clone(), config.upstreams.shipping.clone());
    spawn_provisioning(tracking.clone(), config.upstreams.tracking.clone());

    let app = build_gateway_router(GatewayState::from_handles(&config, shipping, tracking));
    let adapter = HttpAdapter::new(config.bind_addr()?, app);
    tracing::info!("Starting {}", adapter.summary());

    let shutdown = CancellationToken::new();
    let server = adapter.start(shutdown.clone()).await?;

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    server.await?;
    Ok(())
}
