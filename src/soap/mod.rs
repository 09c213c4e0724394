//! Minimal SOAP engine: WSDL discovery, envelope rendering, response
//! decoding and an HTTP client that ties them together.
//!
//! The gateway only depends on the [`SoapClient`] trait, so handlers can be
//! exercised against in-memory clients.

pub mod client;
pub mod envelope;
pub mod error;
pub mod response;
pub mod security;
pub mod wsdl;

pub use client::HttpSoapClient;
pub use error::SoapError;
pub use security::{PasswordType, Security, WsSecurityOptions, TRACKING_WS_SECURITY};
pub use wsdl::{ServiceDescription, SoapVersion};

use async_trait::async_trait;
use serde_json::Value;

/// A callable proxy for one SOAP service.
///
/// Authentication travels with each call rather than living on the client,
/// so concurrent requests never observe each other's credentials.
#[async_trait]
pub trait SoapClient: Send + Sync {
    /// Names of every operation the service contract defines.
    fn operations(&self) -> Vec<String>;

    fn has_operation(&self, name: &str) -> bool {
        self.operations().iter().any(|op| op == name)
    }

    /// Invokes `operation` with `params` as its sole argument.
    ///
    /// The result is array-shaped: element 0 is the decoded body, element 1
    /// the raw response XML.
    async fn invoke(
        &self,
        operation: &str,
        params: &Value,
        security: &Security,
    ) -> Result<Vec<Value>, SoapError>;
}
