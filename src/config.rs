//! Configuration for the Arrowhead client
//!
//! Loaded once at startup; no part of the core re-reads configuration
//! after the identity and transport have been built.

use std::path::PathBuf;

use crate::security::Identity;
use crate::{Error, Result};

/// Host and port of a core service
#[derive(Debug, Clone)]
pub struct CoreEndpoint {
    pub host: String,
    pub port: u16,
}

impl CoreEndpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Arrowhead client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether mutual TLS is used for every connection.
    /// Plaintext mode exists only for local development.
    pub tls: bool,

    /// Whether peer certificates are validated against the truststore
    pub verify_peer: bool,

    /// Service registry endpoint
    pub service_registry: CoreEndpoint,

    /// Orchestrator endpoint
    pub orchestrator: CoreEndpoint,

    /// Authorization system endpoint
    pub authorization: CoreEndpoint,

    /// PKCS#12 keystore holding this system's key and certificate chain
    pub keystore_path: Option<PathBuf>,

    /// CA bundle used to validate peers
    pub truststore_path: Option<PathBuf>,

    /// Keystore password
    pub keystore_password: Option<String>,

    /// Name this system registers and orchestrates under
    pub system_name: Option<String>,

    /// Address this system is reachable at
    pub system_address: String,

    /// Port this system listens on
    pub system_port: u16,

    /// Per-request deadline in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tls: true,
            verify_peer: true,
            service_registry: CoreEndpoint::new("c1-serviceregistry", 8443),
            orchestrator: CoreEndpoint::new("c1-orchestrator", 8441),
            authorization: CoreEndpoint::new("c1-authorization", 8445),
            keystore_path: None,
            truststore_path: None,
            keystore_password: None,
            system_name: None,
            system_address: "localhost".to_string(),
            system_port: 8080,
            request_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from `ARROWHEAD_*` environment variables,
    /// falling back to the local-cloud defaults
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable does not parse
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            tls: env_flag("ARROWHEAD_TLS", defaults.tls),
            verify_peer: env_flag("ARROWHEAD_VERIFY_PEER", defaults.verify_peer),
            service_registry: CoreEndpoint::new(
                env_or("ARROWHEAD_SERVICEREGISTRY_HOST", &defaults.service_registry.host),
                env_port("ARROWHEAD_SERVICEREGISTRY_PORT", defaults.service_registry.port)?,
            ),
            orchestrator: CoreEndpoint::new(
                env_or("ARROWHEAD_ORCHESTRATOR_HOST", &defaults.orchestrator.host),
                env_port("ARROWHEAD_ORCHESTRATOR_PORT", defaults.orchestrator.port)?,
            ),
            authorization: CoreEndpoint::new(
                env_or("ARROWHEAD_AUTHORIZATION_HOST", &defaults.authorization.host),
                env_port("ARROWHEAD_AUTHORIZATION_PORT", defaults.authorization.port)?,
            ),
            keystore_path: std::env::var("ARROWHEAD_KEYSTORE_PATH").ok().map(PathBuf::from),
            truststore_path: std::env::var("ARROWHEAD_TRUSTSTORE").ok().map(PathBuf::from),
            keystore_password: std::env::var("ARROWHEAD_KEYSTORE_PASSWORD").ok(),
            system_name: std::env::var("ARROWHEAD_SYSTEM_NAME").ok(),
            system_address: env_or("ARROWHEAD_SYSTEM_ADDRESS", &defaults.system_address),
            system_port: env_port("ARROWHEAD_SYSTEM_PORT", defaults.system_port)?,
            request_timeout_ms: env_u64(
                "ARROWHEAD_REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            )?,
        })
    }

    /// Scheme for outbound URLs
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    /// Load the identity named by the keystore settings, if any
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] when a keystore path is configured
    /// but cannot be opened.
    pub fn load_identity(&self) -> Result<Option<Identity>> {
        let Some(path) = &self.keystore_path else {
            return Ok(None);
        };
        let password = self.keystore_password.as_deref().unwrap_or_default();
        Identity::load(path, password).map(Some)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key).map_or(default, |v| {
        matches!(v.to_ascii_lowercase().as_str(), "true" | "1")
    })
}

fn env_port(key: &str, default: u16) -> Result<u16> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{key} is not a valid port: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{key} is not a valid number: {raw}"))),
        Err(_) => Ok(default),
    }
}
