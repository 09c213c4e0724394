use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod http;

/// A listener that serves gateway traffic.
///
/// The gateway runs a single HTTP adapter, but startup and shutdown are
/// driven through this trait so `run` only deals with join handles and a
/// cancellation token.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Start the adapter.
    ///
    /// Binding happens before this returns, so a bad address is reported
    /// to the caller instead of being logged from inside the task.
    async fn start(&self, shutdown: CancellationToken) -> anyhow::Result<JoinHandle<()>>;

    /// Returns a human-readable summary of the adapter configuration
    fn summary(&self) -> String;
}
