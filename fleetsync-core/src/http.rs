//! Blocking HTTP plumbing shared by the service clients.
//!
//! Every service crate builds an [`HttpClient`] labelled with its service
//! name and funnels calls through [`HttpClient::call`] /
//! [`HttpClient::send_json`], so status handling and URL redaction live in
//! one place.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{excerpt, redact_url, ApiError};

pub const USER_AGENT: &str = concat!("fleetsync/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A `ureq` agent tagged with the name of the service it talks to.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    service: &'static str,
}

impl HttpClient {
    /// Agent with default TLS verification.
    pub fn new(service: &'static str) -> Self {
        Self {
            agent: base_builder().build(),
            service,
        }
    }

    /// Agent that accepts self-signed or mismatched certificates.
    ///
    /// Only the hosting panel uses this; it ships with a self-signed cert.
    pub fn insecure(service: &'static str) -> Result<Self, ApiError> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| ApiError::Setup {
                service,
                message: e.to_string(),
            })?;
        Ok(Self {
            agent: base_builder().tls_connector(Arc::new(connector)).build(),
            service,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Start a request; callers add query params and headers before sending.
    pub fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent.request(method, url)
    }

    /// Send a request without a body.
    pub fn call(&self, request: ureq::Request) -> Result<ureq::Response, ApiError> {
        let url = redact_url(request.url());
        tracing::debug!(service = self.service, method = request.method(), %url, "request");
        self.map_outcome(request.call(), url)
    }

    /// Send a request with a JSON body.
    pub fn send_json<B: Serialize>(
        &self,
        request: ureq::Request,
        body: &B,
    ) -> Result<ureq::Response, ApiError> {
        let url = redact_url(request.url());
        tracing::debug!(service = self.service, method = request.method(), %url, "request with body");
        self.map_outcome(request.send_json(body), url)
    }

    /// Read the whole body as text.
    pub fn read_text(&self, response: ureq::Response) -> Result<String, ApiError> {
        let url = redact_url(response.get_url());
        response.into_string().map_err(|e| ApiError::Decode {
            service: self.service,
            url,
            message: format!("failed to read response body: {e}"),
        })
    }

    /// Read the body and deserialize it as JSON.
    pub fn read_json<T: DeserializeOwned>(&self, response: ureq::Response) -> Result<T, ApiError> {
        let url = redact_url(response.get_url());
        let text = self.read_text(response)?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            service: self.service,
            url,
            message: e.to_string(),
        })
    }

    fn map_outcome(
        &self,
        outcome: Result<ureq::Response, ureq::Error>,
        url: String,
    ) -> Result<ureq::Response, ApiError> {
        match outcome {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                tracing::warn!(service = self.service, status, %url, "request rejected");
                Err(ApiError::Status {
                    service: self.service,
                    status,
                    url,
                    body: excerpt(&body),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                let message = match transport.message() {
                    Some(detail) => format!("{}: {detail}", transport.kind()),
                    None => transport.kind().to_string(),
                };
                Err(ApiError::Transport {
                    service: self.service,
                    url,
                    message,
                })
            }
        }
    }
}

fn base_builder() -> ureq::AgentBuilder {
    ureq::AgentBuilder::new()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
}
