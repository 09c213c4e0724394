use crate::config::{UpstreamConfig, WsdlSource};
use crate::soap::{HttpSoapClient, SoapClient, SoapError};
use crate::upstream::UpstreamHandle;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Reads the WSDL document from disk or fetches it over HTTP.
pub async fn load_wsdl(config: &UpstreamConfig) -> Result<String, SoapError> {
    match config.source() {
        WsdlSource::File(path) => tokio::fs::read_to_string(&path).await.map_err(|e| {
            SoapError::Wsdl(format!("failed to read '{}': {}", path.display(), e))
        }),
        WsdlSource::Url(url) => {
            let mut request = reqwest::Client::new().get(url);
            if let Some(login) = &config.wsdl_login {
                request = request.basic_auth(login, config.wsdl_password.as_ref());
            }
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(SoapError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        }
    }
}

pub async fn build_client(config: &UpstreamConfig) -> Result<HttpSoapClient, SoapError> {
    let wsdl = load_wsdl(config).await?;
    HttpSoapClient::from_wsdl(&wsdl, config.endpoint.clone(), config.timeout())
}

/// Builds the client for `handle` and records the outcome on it.
///
/// Failure is logged and left in place; the gateway keeps serving and the
/// upstream's requests are answered as unavailable.
pub async fn provision(handle: Arc<UpstreamHandle>, config: UpstreamConfig) {
    match build_client(&config).await {
        Ok(client) => {
            tracing::info!(
                upstream = handle.name(),
                endpoint = client.endpoint(),
                operations = client.operations().len(),
                "Soap {} client created",
                handle.name()
            );
            handle.set_ready(Arc::new(client)).await;
        }
        Err(err) => {
            tracing::error!(
                upstream = handle.name(),
                wsdl = %config.wsdl,
                "Soap {} client initialization failed: {}",
                handle.name(),
                err
            );
            handle.set_failed(err.to_string()).await;
        }
    }
}

pub fn spawn_provisioning(handle: Arc<UpstreamHandle>, config: UpstreamConfig) -> JoinHandle<()> {
    tokio::spawn(provision(handle, config))
}
