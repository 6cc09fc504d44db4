//! Error types for the Arrowhead client

use thiserror::Error;

/// Result type alias for Arrowhead operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Arrowhead client
#[derive(Debug, Error)]
pub enum Error {
    /// Keystore could not be parsed, the password was wrong, or the
    /// bundle is missing its private key or leaf certificate
    #[error("credential error: {0}")]
    Credential(String),

    /// Connection or read deadline elapsed
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Peer refused the connection or is unreachable
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    /// Response status did not match the expectation
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code received
        status: u16,
        /// Raw response body
        body: String,
    },

    /// A core-service call failed
    #[error("{operation} failed with status {status}: {detail}")]
    Gateway {
        /// Which core-service operation was attempted
        operation: &'static str,
        /// HTTP status code received
        status: u16,
        /// Error detail extracted from the response body, or the status line
        detail: String,
    },

    /// Name lookup found no match
    #[error("not found: {0}")]
    NotFound(String),

    /// Provider exposes no interfaces, so no authorization rule can be built
    #[error("no interfaces registered for provider: {0}")]
    NoInterfaces(String),

    /// Matched service carries no token for the interface in use
    #[error("no authorization token for interface: {0}")]
    MissingToken(String),

    /// Matched service metadata declares no HTTP method
    #[error("no http-method in service metadata")]
    MissingMethod,

    /// Provider returned a non-success status
    #[error("dispatch failed with status {status}: {body}")]
    Dispatch {
        /// HTTP status code received
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS context setup failed
    #[error("tls error: {0}")]
    Tls(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
