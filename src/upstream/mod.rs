//! Shared upstream client handles and their startup provisioning.

pub mod provision;

pub use provision::{build_client, load_wsdl, provision, spawn_provisioning};

use crate::soap::SoapClient;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lifecycle of one upstream client.
#[derive(Clone)]
pub enum UpstreamState {
    /// Construction has not finished yet.
    Uninitialized,
    Ready(Arc<dyn SoapClient>),
    /// Construction failed; no retry is attempted.
    Failed(String),
}

impl std::fmt::Debug for UpstreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamState::Uninitialized => f.write_str("Uninitialized"),
            UpstreamState::Ready(client) => f
                .debug_tuple("Ready")
                .field(&client.operations())
                .finish(),
            UpstreamState::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

/// A named, process-wide reference to one upstream's client.
///
/// Every request to the upstream reads the same handle; nothing about a
/// request is ever written into it.
#[derive(Debug)]
pub struct UpstreamHandle {
    name: String,
    state: RwLock<UpstreamState>,
}

impl UpstreamHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(UpstreamState::Uninitialized),
        }
    }

    /// A handle that is ready from the start.
    pub fn ready(name: impl Into<String>, client: Arc<dyn SoapClient>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(UpstreamState::Ready(client)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> UpstreamState {
        self.state.read().await.clone()
    }

    pub async fn set_ready(&self, client: Arc<dyn SoapClient>) {
        *self.state.write().await = UpstreamState::Ready(client);
    }

    pub async fn set_failed(&self, reason: impl Into<String>) {
        *self.state.write().await = UpstreamState::Failed(reason.into());
    }

    /// The client, or why it is not available.
    pub async fn client(&self) -> Result<Arc<dyn SoapClient>, String> {
        match &*self.state.read().await {
            UpstreamState::Ready(client) => Ok(client.clone()),
            UpstreamState::Uninitialized => Err("client is still initializing".to_string()),
            UpstreamState::Failed(reason) => Err(format!("client initialization failed: {}", reason)),
        }
    }
}
