use serde_json::{Map, Value};
use thiserror::Error;

/// Why an inbound body was not accepted as a [`RequestEnvelope`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("request body is not a JSON object")]
    NotAnObject,
    #[error("missing or empty field '{0}'")]
    MissingField(&'static str),
}

/// The inbound JSON request: which remote operation to call, its
/// parameters, and the upstream credentials to call it with.
///
/// ```json
/// {
///     "method": "someSoapMethod",
///     "params": { "attributes": { "attr1": "val" }, "param1": "val" },
///     "login": "upstream login",
///     "pass": "upstream password"
/// }
/// ```
#[derive(Clone, PartialEq)]
pub struct RequestEnvelope {
    pub method: String,
    /// Forwarded to the remote operation untouched.
    pub params: Value,
    pub login: String,
    pub pass: String,
}

impl RequestEnvelope {
    /// Parses and validates a raw request body.
    ///
    /// Bodies that are not JSON objects are rejected the same way as
    /// envelopes with missing fields.
    pub fn from_slice(body: &[u8]) -> Result<Self, EnvelopeError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Self::from_map(map),
            _ => Err(EnvelopeError::NotAnObject),
        }
    }

    /// Every field must be present and non-empty. `params` follows the
    /// looser rule of any value that is not null, false, zero or an empty
    /// string, so an empty object is accepted for parameterless operations.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, EnvelopeError> {
        let method = take_string(&mut map, "method")?;
        let params = match map.remove("params") {
            Some(params) if is_present(&params) => params,
            _ => return Err(EnvelopeError::MissingField("params")),
        };
        let login = take_string(&mut map, "login")?;
        let pass = take_string(&mut map, "pass")?;

        Ok(Self {
            method,
            params,
            login,
            pass,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, field: &'static str) -> Result<String, EnvelopeError> {
    match map.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(EnvelopeError::MissingField(field)),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl std::fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("method", &self.method)
            .field("params", &self.params)
            .field("login", &self.login)
            .field("pass", &"<redacted>")
            .finish()
    }
}
