use crate::soap::SoapError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Every way a dispatch can end short of a successful result.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing or wrong access token. Carries no detail on purpose.
    #[error("Forbidden")]
    Forbidden,

    #[error("Bad Request")]
    BadRequest,

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Upstream '{upstream}' unavailable: {reason}")]
    UpstreamUnavailable { upstream: String, reason: String },

    #[error("{0}")]
    Invocation(#[from] SoapError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Forbidden => StatusCode::FORBIDDEN,
            DispatchError::BadRequest
            | DispatchError::UnknownOperation(_)
            | DispatchError::Invocation(_) => StatusCode::BAD_REQUEST,
            DispatchError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            DispatchError::Forbidden => status.into_response(),
            other => (status, Json(json!({ "Error": other.to_string() }))).into_response(),
        }
    }
}
