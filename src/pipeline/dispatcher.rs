use crate::models::envelope::RequestEnvelope;
use crate::pipeline::DispatchError;
use crate::soap::{Security, WsSecurityOptions, TRACKING_WS_SECURITY};
use crate::upstream::UpstreamHandle;
use serde_json::Value;
use std::sync::Arc;

/// How a route authenticates against its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVariant {
    Basic,
    WsSecurity(WsSecurityOptions),
}

impl AuthVariant {
    /// Builds the per-call security context from the caller's credentials.
    pub fn security(&self, login: &str, pass: &str) -> Security {
        match self {
            AuthVariant::Basic => Security::basic(login, pass),
            AuthVariant::WsSecurity(options) => Security::ws_security(login, pass, *options),
        }
    }
}

/// The request pipeline for one upstream.
///
/// Flow:
/// 1. Token check
/// 2. Envelope validation
/// 3. Upstream availability
/// 4. Operation lookup
/// 5. Invocation with per-call credentials
/// 6. First element of the result
#[derive(Clone)]
pub struct Dispatcher {
    upstream: Arc<UpstreamHandle>,
    auth: AuthVariant,
    token: Arc<str>,
}

impl Dispatcher {
    pub fn new(upstream: Arc<UpstreamHandle>, auth: AuthVariant, token: impl Into<Arc<str>>) -> Self {
        Self {
            upstream,
            auth,
            token: token.into(),
        }
    }

    /// Shipping calls authenticate with basic credentials.
    pub fn shipping(upstream: Arc<UpstreamHandle>, token: impl Into<Arc<str>>) -> Self {
        Self::new(upstream, AuthVariant::Basic, token)
    }

    /// Tracking calls authenticate with a WS-Security username token.
    pub fn tracking(upstream: Arc<UpstreamHandle>, token: impl Into<Arc<str>>) -> Self {
        Self::new(upstream, AuthVariant::WsSecurity(TRACKING_WS_SECURITY), token)
    }

    pub fn upstream(&self) -> &UpstreamHandle {
        &self.upstream
    }

    pub fn auth(&self) -> AuthVariant {
        self.auth
    }

    /// Exact match against the configured token. An unset token matches nothing.
    pub fn authorize(&self, token: Option<&str>) -> Result<(), DispatchError> {
        match token {
            Some(token) if !self.token.is_empty() && token == &*self.token => Ok(()),
            _ => Err(DispatchError::Forbidden),
        }
    }

    /// Runs one request through the pipeline and returns the response body.
    #[tracing::instrument(skip_all, fields(upstream = self.upstream.name()))]
    pub async fn dispatch(&self, token: Option<&str>, body: &[u8]) -> Result<Value, DispatchError> {
        self.authorize(token)?;

        let envelope = RequestEnvelope::from_slice(body).map_err(|err| {
            tracing::debug!("Rejected envelope: {}", err);
            DispatchError::BadRequest
        })?;

        let client = self.upstream.client().await.map_err(|reason| {
            tracing::warn!("Upstream unavailable: {}", reason);
            DispatchError::UpstreamUnavailable {
                upstream: self.upstream.name().to_string(),
                reason,
            }
        })?;

        if !client.has_operation(&envelope.method) {
            tracing::warn!(operation = %envelope.method, "Unknown operation");
            return Err(DispatchError::UnknownOperation(envelope.method));
        }

        let security = self.auth.security(&envelope.login, &envelope.pass);
        let result = client
            .invoke(&envelope.method, &envelope.params, &security)
            .await
            .map_err(|err| {
                tracing::error!(operation = %envelope.method, "SOAP call failed: {}", err);
                DispatchError::Invocation(err)
            })?;

        Ok(result.into_iter().next().unwrap_or(Value::Null))
    }
}
