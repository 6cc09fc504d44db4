//! Process-wide HTTP(S) client bound to the loaded identity
//!
//! One instance per process, built once, safe to drive concurrently.
//! Every call carries an explicit deadline; there is no retry here —
//! retry policy, if any, belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::security::Identity;
use crate::{Error, Result};

/// A single outbound request
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl WireRequest {
    /// A JSON request carrying the usual `Content-Type`/`Accept` pair
    #[must_use]
    pub fn json(method: Method, url: String, body: Option<Vec<u8>>, timeout: Duration) -> Self {
        Self {
            method,
            url,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body,
            timeout,
        }
    }
}

/// Status and body of a completed call
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Body as lossy UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Enforce an expected status
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] carrying the actual status and body.
    pub fn expect(self, status: u16) -> Result<Self> {
        if self.status == status {
            Ok(self)
        } else {
            Err(Error::Status {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Seam between the typed gateways and the wire
///
/// Production code uses [`Transport`]; tests substitute a mock to count
/// and script calls.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: WireRequest) -> Result<WireResponse>;
}

/// The reqwest-backed transport
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    /// Build the transport from configuration and the loaded identity
    ///
    /// With TLS enabled the client presents the identity's certificate
    /// and validates peers against the truststore only. With TLS or peer
    /// verification disabled a warning is logged; those modes exist for
    /// local development.
    ///
    /// # Errors
    ///
    /// Returns error if the identity or truststore cannot be handed to
    /// the TLS stack.
    pub fn new(config: &Config, identity: Option<&Identity>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if config.tls {
            if let Some(identity) = identity {
                let tls_identity = reqwest::Identity::from_pkcs12_der(
                    identity.pkcs12_der(),
                    identity.password(),
                )
                .map_err(|e| Error::Tls(format!("cannot load client identity: {e}")))?;
                builder = builder.identity(tls_identity);
            }

            if let Some(truststore) = &config.truststore_path {
                let bundle = std::fs::read(truststore)?;
                let roots = reqwest::Certificate::from_pem_bundle(&bundle)
                    .map_err(|e| Error::Tls(format!("invalid truststore: {e}")))?;
                builder = builder.tls_built_in_root_certs(false);
                for root in roots {
                    builder = builder.add_root_certificate(root);
                }
            }

            if !config.verify_peer {
                tracing::warn!(
                    "peer certificate verification is DISABLED; development use only"
                );
                builder = builder.danger_accept_invalid_certs(true);
            }
        } else {
            tracing::warn!("TLS is DISABLED; plaintext connections, development use only");
        }

        let client = builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot build http client: {e}")))?;

        Ok(Self { client })
    }

    /// A transport without identity material, for plaintext development setups
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built.
    pub fn plaintext(config: &Config) -> Result<Self> {
        Self::new(config, None)
    }
}

#[async_trait]
impl HttpTransport for Transport {
    async fn request(&self, request: WireRequest) -> Result<WireResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&request.url, e))?
            .to_vec();

        Ok(WireResponse { status, body })
    }
}

/// Map a reqwest failure onto the transport taxonomy
fn classify(url: &str, error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout(url.to_string())
    } else if error.is_connect() {
        Error::Unreachable(url.to_string())
    } else {
        Error::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_matching_status() {
        let response = WireResponse {
            status: 201,
            body: b"{}".to_vec(),
        };
        assert!(response.expect(201).is_ok());
    }

    #[test]
    fn test_expect_mismatch_carries_body() {
        let response = WireResponse {
            status: 400,
            body: b"bad request".to_vec(),
        };
        match response.expect(201) {
            Err(Error::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad request");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_request_carries_content_headers() {
        let request = WireRequest::json(
            Method::POST,
            "https://example.test/".to_string(),
            None,
            Duration::from_secs(5),
        );
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "Content-Type" && value == "application/json"));
    }
}
