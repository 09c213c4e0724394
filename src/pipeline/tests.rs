use super::*;
use crate::soap::{Security, SoapClient, SoapError, TRACKING_WS_SECURITY};
use crate::upstream::UpstreamHandle;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const TOKEN: &str = "secret-token";

/// Records every invocation and answers with a canned result.
struct RecordingClient {
    operations: Vec<String>,
    result: Result<Vec<Value>, String>,
    calls: Mutex<Vec<(String, Value, Security)>>,
}

impl RecordingClient {
    fn answering(result: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            operations: vec!["sprawdzPrzesylke".to_string(), "getGuid".to_string()],
            result: Ok(result),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            operations: vec!["getGuid".to_string()],
            result: Err(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Value, Security)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SoapClient for RecordingClient {
    fn operations(&self) -> Vec<String> {
        self.operations.clone()
    }

    async fn invoke(
        &self,
        operation: &str,
        params: &Value,
        security: &Security,
    ) -> Result<Vec<Value>, SoapError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), params.clone(), security.clone()));
        self.result.clone().map_err(|reason| SoapError::Fault {
            code: "soap:Server".to_string(),
            reason,
        })
    }
}

fn shipping(client: Arc<RecordingClient>) -> Dispatcher {
    Dispatcher::shipping(Arc::new(UpstreamHandle::ready("shipping", client)), TOKEN)
}

fn tracking(client: Arc<RecordingClient>) -> Dispatcher {
    Dispatcher::tracking(Arc::new(UpstreamHandle::ready("tracking", client)), TOKEN)
}

fn body(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

fn valid_envelope() -> Vec<u8> {
    body(json!({
        "method": "getGuid",
        "params": { "ilosc": 1 },
        "login": "user",
        "pass": "pass"
    }))
}

#[tokio::test]
async fn missing_or_wrong_token_is_forbidden_without_a_call() {
    let client = RecordingClient::answering(vec![json!("ok")]);
    let dispatcher = shipping(client.clone());

    for token in [None, Some("wrong"), Some("")] {
        let err = dispatcher.dispatch(token, &valid_envelope()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden), "token {:?}", token);
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn empty_configured_token_rejects_everything() {
    let client = RecordingClient::answering(vec![json!("ok")]);
    let dispatcher = Dispatcher::shipping(
        Arc::new(UpstreamHandle::ready("shipping", client.clone())),
        "",
    );

    let err = dispatcher.dispatch(Some(""), &valid_envelope()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn token_is_checked_before_the_body() {
    let dispatcher = shipping(RecordingClient::answering(vec![]));

    let err = dispatcher.dispatch(None, b"not json").await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden));
}

#[tokio::test]
async fn incomplete_envelope_is_bad_request_without_a_call() {
    let client = RecordingClient::answering(vec![json!("ok")]);
    let dispatcher = shipping(client.clone());

    let cases = [
        json!({ "params": {}, "login": "u", "pass": "p" }),
        json!({ "method": "getGuid", "login": "u", "pass": "p" }),
        json!({ "method": "getGuid", "params": {}, "pass": "p" }),
        json!({ "method": "getGuid", "params": {}, "login": "u" }),
        json!({ "method": "", "params": {}, "login": "u", "pass": "p" }),
        json!({ "method": "getGuid", "params": null, "login": "u", "pass": "p" }),
    ];
    for case in cases {
        let err = dispatcher.dispatch(Some(TOKEN), &body(case.clone())).await.unwrap_err();
        assert!(matches!(err, DispatchError::BadRequest), "case {}", case);
    }

    let err = dispatcher.dispatch(Some(TOKEN), b"{broken").await.unwrap_err();
    assert!(matches!(err, DispatchError::BadRequest));

    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn success_returns_first_result_element() {
    let client = RecordingClient::answering(vec![json!({ "guid": ["A"] }), json!("<raw/>")]);
    let dispatcher = shipping(client.clone());

    let value = dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap();

    assert_eq!(value, json!({ "guid": ["A"] }));
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "getGuid");
    assert_eq!(calls[0].1, json!({ "ilosc": 1 }));
}

#[tokio::test]
async fn empty_result_is_null() {
    let dispatcher = shipping(RecordingClient::answering(vec![]));

    let value = dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn shipping_uses_basic_credentials_from_the_envelope() {
    let client = RecordingClient::answering(vec![json!(1)]);
    let dispatcher = shipping(client.clone());

    dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap();

    assert_eq!(client.calls()[0].2, Security::basic("user", "pass"));
}

#[tokio::test]
async fn tracking_uses_ws_security_with_fixed_options() {
    let client = RecordingClient::answering(vec![json!(1)]);
    let dispatcher = tracking(client.clone());
    let request = body(json!({
        "method": "sprawdzPrzesylke",
        "params": { "numer": "00359007738914012345" },
        "login": "sledzeniepp",
        "pass": "PPSA"
    }));

    dispatcher.dispatch(Some(TOKEN), &request).await.unwrap();

    assert_eq!(
        client.calls()[0].2,
        Security::ws_security("sledzeniepp", "PPSA", TRACKING_WS_SECURITY)
    );
    assert_eq!(dispatcher.auth(), AuthVariant::WsSecurity(TRACKING_WS_SECURITY));
}

#[tokio::test]
async fn concurrent_calls_keep_their_own_credentials() {
    let client = RecordingClient::answering(vec![json!(1)]);
    let dispatcher = tracking(client.clone());

    let requests = (0..16).map(|i| {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let request = body(json!({
                "method": "getGuid",
                "params": { "i": i },
                "login": format!("user-{}", i),
                "pass": format!("pass-{}", i)
            }));
            dispatcher.dispatch(Some(TOKEN), &request).await
        })
    });
    for handle in requests.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    let calls = client.calls();
    assert_eq!(calls.len(), 16);
    for (_, params, security) in calls {
        let i = params["i"].as_i64().unwrap();
        assert_eq!(
            security,
            Security::ws_security(format!("user-{}", i), format!("pass-{}", i), TRACKING_WS_SECURITY)
        );
    }
}

#[tokio::test]
async fn unknown_operation_is_rejected_without_a_call() {
    let client = RecordingClient::answering(vec![json!(1)]);
    let dispatcher = shipping(client.clone());
    let request = body(json!({
        "method": "toString",
        "params": {},
        "login": "u",
        "pass": "p"
    }));

    let err = dispatcher.dispatch(Some(TOKEN), &request).await.unwrap_err();

    assert!(matches!(err, DispatchError::UnknownOperation(ref op) if op == "toString"));
    assert_eq!(err.to_string(), "Unknown operation 'toString'");
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn remote_failure_carries_the_error_text() {
    let dispatcher = shipping(RecordingClient::failing("Invalid credentials"));

    let err = dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap_err();

    assert!(matches!(err, DispatchError::Invocation(_)));
    assert_eq!(err.to_string(), "soap:Server: Invalid credentials");
    assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uninitialized_and_failed_upstreams_are_unavailable() {
    let handle = Arc::new(UpstreamHandle::new("tracking"));
    let dispatcher = Dispatcher::tracking(handle.clone(), TOKEN);

    let err = dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap_err();
    assert!(matches!(err, DispatchError::UpstreamUnavailable { .. }));
    assert_eq!(err.status(), http::StatusCode::SERVICE_UNAVAILABLE);

    handle.set_failed("connection refused").await;
    let err = dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Upstream 'tracking' unavailable: client initialization failed: connection refused"
    );
}

#[tokio::test]
async fn upstream_becoming_ready_is_picked_up() {
    let handle = Arc::new(UpstreamHandle::new("shipping"));
    let dispatcher = Dispatcher::shipping(handle.clone(), TOKEN);
    assert!(dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.is_err());

    handle.set_ready(RecordingClient::answering(vec![json!("late")])).await;

    let value = dispatcher.dispatch(Some(TOKEN), &valid_envelope()).await.unwrap();
    assert_eq!(value, json!("late"));
}

#[test]
fn error_statuses() {
    use http::StatusCode;

    assert_eq!(DispatchError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(DispatchError::BadRequest.status(), StatusCode::BAD_REQUEST);
    assert_eq!(DispatchError::BadRequest.to_string(), "Bad Request");
    assert_eq!(
        DispatchError::UnknownOperation("x".into()).status(),
        StatusCode::BAD_REQUEST
    );
}
