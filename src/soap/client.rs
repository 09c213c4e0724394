use crate::soap::envelope::{build_envelope, ENVELOPE_PREFIX};
use crate::soap::response::parse_response;
use crate::soap::wsdl::{parse_wsdl, ServiceDescription, SoapVersion};
use crate::soap::{Security, SoapClient, SoapError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// A [`SoapClient`] that posts envelopes to the service address over HTTP.
pub struct HttpSoapClient {
    http: Client,
    endpoint: String,
    description: ServiceDescription,
}

impl HttpSoapClient {
    /// Builds a client from a parsed contract.
    ///
    /// `endpoint` overrides the address declared in the WSDL; one of the two
    /// must be present.
    pub fn new(
        description: ServiceDescription,
        endpoint: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SoapError> {
        let endpoint = endpoint
            .or_else(|| description.endpoint.clone())
            .ok_or_else(|| SoapError::Wsdl("WSDL declares no SOAP service address".to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            description,
        })
    }

    /// Parses `wsdl` and builds a client from it.
    pub fn from_wsdl(
        wsdl: &str,
        endpoint: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SoapError> {
        Self::new(parse_wsdl(wsdl)?, endpoint, timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    fn headers(&self, soap_action: Option<&str>) -> Result<HeaderMap, SoapError> {
        let action = soap_action.unwrap_or_default();
        let mut headers = HeaderMap::new();
        match self.description.version {
            SoapVersion::Soap11 => {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/xml; charset=utf-8"),
                );
                headers.insert("soapaction", header_value(&format!("\"{}\"", action))?);
            }
            SoapVersion::Soap12 => {
                let content_type = if action.is_empty() {
                    "application/soap+xml; charset=utf-8".to_string()
                } else {
                    format!("application/soap+xml; charset=utf-8; action=\"{}\"", action)
                };
                headers.insert(CONTENT_TYPE, header_value(&content_type)?);
            }
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, SoapError> {
    HeaderValue::from_str(value)
        .map_err(|e| SoapError::Wsdl(format!("invalid header value '{}': {}", value, e)))
}

#[async_trait]
impl SoapClient for HttpSoapClient {
    fn operations(&self) -> Vec<String> {
        self.description.operation_names()
    }

    fn has_operation(&self, name: &str) -> bool {
        self.description.operations.contains_key(name)
    }

    async fn invoke(
        &self,
        operation: &str,
        params: &Value,
        security: &Security,
    ) -> Result<Vec<Value>, SoapError> {
        let info = self
            .description
            .operation(operation)
            .ok_or_else(|| SoapError::UnknownOperation(operation.to_string()))?;

        let header = security.soap_header(ENVELOPE_PREFIX);
        let body = build_envelope(self.description.version, info, params, header.as_deref())?;

        tracing::debug!(
            operation,
            endpoint = %self.endpoint,
            "Sending SOAP request"
        );

        let request = self
            .http
            .post(&self.endpoint)
            .headers(self.headers(info.soap_action.as_deref())?)
            .body(body);
        let response = security.apply(request).send().await?;

        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(operation, status = status.as_u16(), "Received SOAP response");

        if status.is_success() {
            let result = parse_response(&text)?;
            return Ok(vec![result, Value::String(text)]);
        }

        // SOAP 1.1 services answer faults with HTTP 500
        match parse_response(&text) {
            Err(fault @ SoapError::Fault { .. }) => Err(fault),
            _ => Err(SoapError::Http {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}
