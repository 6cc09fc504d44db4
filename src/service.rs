//! Handler-facing types for provider services
//!
//! A service handler declares the parameter names it wants; the router
//! binds each name from the inbound request and hands the result over
//! as [`Args`]. What comes back is a [`ServiceResponse`], serialized
//! onto the wire by the router.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// Raw request parameters: split query map plus the unparsed payload
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub query_params: HashMap<String, String>,
    pub payload: Option<Vec<u8>>,
}

impl Params {
    /// Parameters carrying nothing
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parameters carrying only a payload
    #[must_use]
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            query_params: HashMap::new(),
            payload: Some(payload),
        }
    }
}

/// A value bound to one declared handler parameter
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// Parsed JSON body (under the payload aliases) or a declared default
    Json(Value),
    /// Query-parameter map (under the query aliases)
    Query(HashMap<String, String>),
    /// The full raw parameter object
    Raw(Params),
    /// Nothing matched and no default was declared
    Absent,
}

impl ArgValue {
    /// The JSON value, if this argument bound one
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The query map, if this argument bound one
    #[must_use]
    pub fn as_query(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Query(map) => Some(map),
            _ => None,
        }
    }
}

/// Arguments bound by name for one handler invocation
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    pub(crate) fn push(&mut self, name: String, value: ArgValue) {
        self.values.push((name, value));
    }

    /// Look up a bound argument by its declared name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    /// Shorthand for the JSON value bound to `name`
    #[must_use]
    pub fn json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(ArgValue::as_json)
    }

    /// Shorthand for the query map bound to `name`
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.get(name).and_then(ArgValue::as_query)
    }

    /// Declared names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

/// Error type handlers are free to fail with
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a handler produces; the router serializes it onto the wire
#[derive(Debug, Clone)]
pub enum ServiceResponse {
    /// Passed through unchanged
    Bytes(Vec<u8>),
    /// Encoded as UTF-8
    Text(String),
    /// Maps and sequences serialize as JSON; scalars use their
    /// canonical text form
    Json(Value),
}

impl ServiceResponse {
    /// Serialize into a content type and body
    #[must_use]
    pub fn into_body(self) -> (&'static str, Vec<u8>) {
        match self {
            Self::Bytes(bytes) => ("application/octet-stream", bytes),
            Self::Text(text) => ("text/plain; charset=utf-8", text.into_bytes()),
            Self::Json(value) => match &value {
                Value::Object(_) | Value::Array(_) => (
                    "application/json",
                    serde_json::to_vec(&value).unwrap_or_default(),
                ),
                Value::String(text) => ("text/plain; charset=utf-8", text.clone().into_bytes()),
                other => ("text/plain; charset=utf-8", other.to_string().into_bytes()),
            },
        }
    }
}

impl From<Value> for ServiceResponse {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for ServiceResponse {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for ServiceResponse {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// An inbound service implementation
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Handle one request
    ///
    /// Errors never escape the router; they become a JSON error body.
    async fn handle(&self, args: Args) -> Result<ServiceResponse, HandlerError>;
}

/// Blanket impl so plain async closures register directly
#[async_trait]
impl<F, Fut> ServiceHandler for F
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ServiceResponse, HandlerError>> + Send,
{
    async fn handle(&self, args: Args) -> Result<ServiceResponse, HandlerError> {
        self(args).await
    }
}
