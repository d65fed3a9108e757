//! JSON-over-HTTP admin transport.
//!
//! Each command document is POSTed to `{scheme}://{host:port}/admin/command`.
//! Authenticated sessions send their credentials as HTTP basic auth.

use std::time::Duration;

use async_trait::async_trait;
use corral_core::{Endpoint, Error, Result};
use reqwest::{Client, StatusCode};

use crate::command::AdminCommand;
use crate::reply::{CommandError, ErrorClass};
use crate::transport::{AdminTransport, Credentials, Document};

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// URL scheme, `http` or `https`.
    pub scheme: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Admin transport that speaks JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    scheme: String,
}

impl HttpTransport {
    /// Creates a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme is unsupported or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        if !matches!(config.scheme.as_str(), "http" | "https") {
            return Err(Error::configuration(format!(
                "unsupported transport scheme '{}'",
                config.scheme
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
        })
    }

    fn command_url(&self, endpoint: &Endpoint) -> String {
        format!("{}://{endpoint}/admin/command", self.scheme)
    }
}

#[async_trait]
impl AdminTransport for HttpTransport {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
        command: &AdminCommand,
    ) -> std::result::Result<Document, CommandError> {
        let mut req = self
            .client
            .post(self.command_url(endpoint))
            .json(&command.to_document());
        if let Some(credentials) = credentials {
            req = req.basic_auth(&credentials.user, Some(&credentials.secret));
        }

        let response = req.send().await.map_err(|e| classify_transport_error(&e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        // Error statuses still count as replies when the body is a document.
        match serde_json::from_str::<Document>(&body) {
            Ok(reply) if reply.is_object() => Ok(reply),
            _ if is_gateway_failure(status) => Err(CommandError::connectivity(format!(
                "{} got HTTP {status} from gateway: {body}",
                command.name()
            ))),
            _ => Err(CommandError::new(
                ErrorClass::Rejected,
                format!("{} returned HTTP {status}: {body}", command.name()),
            )),
        }
    }
}

fn classify_transport_error(err: &reqwest::Error) -> CommandError {
    if err.is_timeout() {
        CommandError::timeout(format!("request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        CommandError::connectivity(format!("cannot reach endpoint: {err}"))
    } else {
        CommandError::new(ErrorClass::Rejected, format!("transport error: {err}"))
    }
}

/// The gateway answered but the server behind it did not.
fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}
