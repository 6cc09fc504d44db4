//! Typed gateway over the registry, orchestrator, and authorization APIs
//!
//! Each remote capability is one thin wrapper: serialize the request
//! model, call the transport with the expected success status,
//! deserialize the response model. Non-matching statuses surface as
//! [`Error::Gateway`]; nothing here retries.

mod authorization;
mod registry;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;

use crate::config::Config;
use crate::models::CoreErrorBody;
use crate::security::Identity;
use crate::transport::{HttpTransport, Transport, WireRequest, WireResponse};
use crate::{Error, Result};

/// Client for the three core services
#[derive(Clone)]
pub struct CoreClient {
    transport: Arc<dyn HttpTransport>,
    config: Config,
}

impl CoreClient {
    /// Build a client over an existing transport
    #[must_use]
    pub fn new(config: Config, transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport, config }
    }

    /// Build a client and its transport from configuration and identity
    ///
    /// # Errors
    ///
    /// Returns error if the TLS context cannot be assembled.
    pub fn connect(config: Config, identity: Option<&Identity>) -> Result<Self> {
        let transport = Transport::new(&config, identity)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// The transport shared with dispatchers
    #[must_use]
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    pub(crate) fn registry_url(&self, path: &str) -> String {
        format!(
            "{}://{}:{}/serviceregistry{path}",
            self.config.scheme(),
            self.config.service_registry.host,
            self.config.service_registry.port
        )
    }

    pub(crate) fn orchestrator_url(&self, path: &str) -> String {
        format!(
            "{}://{}:{}/orchestrator{path}",
            self.config.scheme(),
            self.config.orchestrator.host,
            self.config.orchestrator.port
        )
    }

    pub(crate) fn authorization_url(&self, path: &str) -> String {
        format!(
            "{}://{}:{}/authorization{path}",
            self.config.scheme(),
            self.config.authorization.host,
            self.config.authorization.port
        )
    }

    /// One core-service call with an expected status
    pub(crate) async fn call(
        &self,
        operation: &'static str,
        method: Method,
        url: String,
        body: Option<Vec<u8>>,
        expected: u16,
    ) -> Result<WireResponse> {
        let request = WireRequest::json(method, url, body, self.timeout());
        let response = self.transport.request(request).await?;

        match response.expect(expected) {
            Ok(response) => Ok(response),
            Err(Error::Status { status, body }) => {
                let detail = error_detail(status, &body);
                tracing::error!(operation, status, %detail, "core-service call failed");
                Err(Error::Gateway {
                    operation,
                    status,
                    detail,
                })
            }
            Err(other) => Err(other),
        }
    }
}

impl std::fmt::Debug for CoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Extract the error detail the core services put in their body,
/// falling back to the raw status line
fn error_detail(status: u16, body: &str) -> String {
    serde_json::from_str::<CoreErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error_message)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
