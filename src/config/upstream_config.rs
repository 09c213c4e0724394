use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const SHIPPING_WSDL: &str = "wsdl/labs.wsdl";
const TRACKING_WSDL: &str = "https://ws.poczta-polska.pl/Sledzenie/services/Sledzenie?wsdl";

/// The two SOAP upstreams the gateway fronts.
#[derive(Debug, Deserialize)]
pub struct UpstreamsConfig {
    #[serde(default = "UpstreamConfig::shipping")]
    pub shipping: UpstreamConfig,
    #[serde(default = "UpstreamConfig::tracking")]
    pub tracking: UpstreamConfig,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            shipping: UpstreamConfig::shipping(),
            tracking: UpstreamConfig::tracking(),
        }
    }
}

/// Where and how to reach one SOAP upstream.
#[derive(Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Local path or http(s) URL of the WSDL contract.
    pub wsdl: String,
    /// Overrides the service address declared in the WSDL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Credentials used only to fetch a remote WSDL.
    #[serde(default)]
    pub wsdl_login: Option<String>,
    #[serde(default)]
    pub wsdl_password: Option<String>,
    /// Request timeout for SOAP calls. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// A parsed WSDL location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsdlSource {
    File(PathBuf),
    Url(Url),
}

impl UpstreamConfig {
    pub fn shipping() -> Self {
        Self::from_wsdl(SHIPPING_WSDL)
    }

    pub fn tracking() -> Self {
        Self::from_wsdl(TRACKING_WSDL)
    }

    pub fn from_wsdl(wsdl: impl Into<String>) -> Self {
        Self {
            wsdl: wsdl.into(),
            endpoint: None,
            wsdl_login: None,
            wsdl_password: None,
            timeout_secs: None,
        }
    }

    /// Classifies the `wsdl` setting as a remote URL or a local file.
    pub fn source(&self) -> WsdlSource {
        let wsdl = self.wsdl.trim();
        if wsdl.starts_with("http://") || wsdl.starts_with("https://") {
            if let Ok(url) = Url::parse(wsdl) {
                return WsdlSource::Url(url);
            }
        }
        WsdlSource::File(PathBuf::from(wsdl))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("wsdl", &self.wsdl)
            .field("endpoint", &self.endpoint)
            .field("wsdl_login", &self.wsdl_login)
            .field("wsdl_password", &self.wsdl_password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
