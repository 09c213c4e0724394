use crate::adapters::ProtocolAdapter;
use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod router;

pub use router::{build_gateway_router, GatewayState};

/// HTTP Protocol Adapter
///
/// Wraps the Axum server that exposes the gateway routes.
pub struct HttpAdapter {
    pub bind_addr: SocketAddr,
    app: Router,
}

impl HttpAdapter {
    pub fn new(bind_addr: SocketAddr, app: Router) -> Self {
        Self { bind_addr, app }
    }
}

#[async_trait]
impl ProtocolAdapter for HttpAdapter {
    async fn start(&self, shutdown: CancellationToken) -> anyhow::Result<JoinHandle<()>> {
        let bind_addr = self.bind_addr;
        let app = self.app.clone();

        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            anyhow::anyhow!("Failed to bind HTTP adapter to {}: {}", bind_addr, e)
        })?;

        tracing::info!("🚀 HTTP adapter started on {}", bind_addr);

        Ok(tokio::spawn(async move {
            let graceful_shutdown = async move {
                shutdown.cancelled().await;
            };

            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(graceful_shutdown)
                .await
            {
                tracing::error!("HTTP adapter on {} encountered error: {}", bind_addr, e);
            }

            tracing::info!("HTTP adapter on {} shut down", bind_addr);
        }))
    }

    fn summary(&self) -> String {
        format!("HttpAdapter(bind={})", self.bind_addr)
    }
}
