use crate::config::{Cli, GatewayConfig, LoggingConfig, NetworkConfig, UpstreamsConfig};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Gateway id must not be empty")]
    InvalidGatewayId,
    #[error("Upstream '{0}' requires a non-empty 'wsdl' source")]
    MissingWsdl(&'static str),
    #[error("Invalid bind address '{0}'")]
    InvalidBindAddress(String),
    #[error("Invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}

/// Top-level gateway configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub upstreams: UpstreamsConfig,
}

impl Config {
    /// Loads the config named on the command line, applies environment
    /// overrides and validates the result.
    pub fn from_args() -> Result<Self, ConfigError> {
        let cli = Cli::parse();
        let mut config = Self::load_from_path(Path::new(&cli.config_path))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies `SOAP_*` overrides looked up through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SOAP_PORT") {
            self.network.http.bind_port =
                port.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidEnv {
                        name: "SOAP_PORT",
                        reason: e.to_string(),
                    }
                })?;
        }
        if let Some(token) = lookup("SOAP_TOKEN") {
            self.gateway.token = token;
        }
        if let Some(login) = lookup("SOAP_TRACKING_WSDL_LOGIN") {
            self.upstreams.tracking.wsdl_login = Some(login);
        }
        if let Some(password) = lookup("SOAP_TRACKING_WSDL_PASSWORD") {
            self.upstreams.tracking.wsdl_password = Some(password);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.id.trim().is_empty() {
            return Err(ConfigError::InvalidGatewayId);
        }
        if self.upstreams.shipping.wsdl.trim().is_empty() {
            return Err(ConfigError::MissingWsdl("shipping"));
        }
        if self.upstreams.tracking.wsdl.trim().is_empty() {
            return Err(ConfigError::MissingWsdl("tracking"));
        }
        if self.network.http.bind_port == 0 {
            return Err(ConfigError::InvalidBindAddress(format!(
                "{}:0",
                self.network.http.bind_address
            )));
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Settings that are valid but leave the gateway unusable.
    pub fn startup_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.gateway.token.is_empty() {
            warnings.push("No gateway token configured; every dispatch request will be rejected");
        }
        warnings
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!(
            "{}:{}",
            self.network.http.bind_address, self.network.http.bind_port
        );
        raw.parse().map_err(|_| ConfigError::InvalidBindAddress(raw))
    }
}
