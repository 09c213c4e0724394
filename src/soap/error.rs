use thiserror::Error;

/// Failures of a SOAP call or of building a client.
///
/// The `Display` form is what callers see in the `Error` field of a 400
/// response.
#[derive(Debug, Error)]
pub enum SoapError {
    #[error("WSDL error: {0}")]
    Wsdl(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{code}: {reason}")]
    Fault { code: String, reason: String },

    #[error("Invalid XML name '{0}'")]
    InvalidName(String),

    #[error("No such operation: {0}")]
    UnknownOperation(String),
}

impl From<quick_xml::Error> for SoapError {
    fn from(err: quick_xml::Error) -> Self {
        SoapError::Xml(err.to_string())
    }
}
