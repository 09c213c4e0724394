use crate::config::Config;
use crate::pipeline::Dispatcher;
use crate::upstream::UpstreamHandle;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http::StatusCode;
use std::sync::Arc;

pub const SHIPPING_PATH: &str = "/soap-agent";
pub const TRACKING_PATH: &str = "/tracking-agent";

/// One dispatcher per exposed route.
#[derive(Clone)]
pub struct GatewayState {
    pub shipping: Dispatcher,
    pub tracking: Dispatcher,
}

impl GatewayState {
    pub fn new(shipping: Dispatcher, tracking: Dispatcher) -> Self {
        Self { shipping, tracking }
    }

    /// Wires both routes to their upstream handles using the configured token.
    pub fn from_handles(
        config: &Config,
        shipping: Arc<UpstreamHandle>,
        tracking: Arc<UpstreamHandle>,
    ) -> Self {
        let token: Arc<str> = Arc::from(config.gateway.token.as_str());
        Self::new(
            Dispatcher::shipping(shipping, token.clone()),
            Dispatcher::tracking(tracking, token),
        )
    }
}

/// Build the gateway router.
///
/// Only `POST` on the two agent paths reaches a dispatcher; any other
/// method or path is answered with a bare 403.
pub fn build_gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route(SHIPPING_PATH, post(shipping_agent).fallback(forbidden))
        .route(TRACKING_PATH, post(tracking_agent).fallback(forbidden))
        .fallback(forbidden)
        .with_state(state)
}

async fn shipping_agent(
    State(state): State<GatewayState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    handle_request(&state.shipping, query, &body).await
}

async fn tracking_agent(
    State(state): State<GatewayState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    handle_request(&state.tracking, query, &body).await
}

async fn forbidden() -> StatusCode {
    StatusCode::FORBIDDEN
}

async fn handle_request(dispatcher: &Dispatcher, query: Option<String>, body: &[u8]) -> Response {
    let token = query.as_deref().and_then(query_token);
    match dispatcher.dispatch(token.as_deref(), body).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => {
            tracing::debug!(
                upstream = dispatcher.upstream().name(),
                status = err.status().as_u16(),
                "Request rejected: {}",
                err
            );
            err.into_response()
        }
    }
}

/// The `token` query value, if it appears exactly once.
pub fn query_token(query: &str) -> Option<String> {
    let mut values = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned());
    let first = values.next()?;
    values.next().is_none().then_some(first)
}
