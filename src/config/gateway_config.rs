use serde::Deserialize;

/// Identity, log level and the shared access token of the gateway.
#[derive(Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub id: String,
    pub log_level: String,
    /// Shared secret compared against the `token` query parameter.
    /// An empty token rejects every dispatch request.
    pub token: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            id: "soap-gateway".to_string(),
            log_level: default_log_level(),
            token: String::new(),
        }
    }
}

/// Default log level for the gateway configuration
fn default_log_level() -> String {
    "info".to_string()
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("id", &self.id)
            .field("log_level", &self.log_level)
            .field("token", &"<redacted>")
            .finish()
    }
}
