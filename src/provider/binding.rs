//! Name-based parameter binding for inbound requests
//!
//! Handlers declare parameter names; each name resolves through a fixed
//! alias table: the parsed JSON body under `payload`/`data`/`body`, the
//! query map under `query_params`/`query`/`request_params`, and the full
//! raw parameter object under `params`. Binding is by name only.

use serde_json::Value;

use crate::service::{ArgValue, Args, Params};

const PAYLOAD_ALIASES: [&str; 3] = ["payload", "data", "body"];
const QUERY_ALIASES: [&str; 3] = ["query_params", "query", "request_params"];
const RAW_ALIAS: &str = "params";

/// One declared handler parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A parameter with no default; an unmatched name binds absent and
    /// logs a warning rather than rejecting the request
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter falling back to `default` when nothing matches
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// Resolve every declared parameter against the request
pub(crate) fn bind(specs: &[ParamSpec], params: &Params) -> Args {
    let payload = parse_payload(params.payload.as_deref());

    let mut args = Args::default();
    for spec in specs {
        let value = if PAYLOAD_ALIASES.contains(&spec.name.as_str()) {
            ArgValue::Json(payload.clone())
        } else if QUERY_ALIASES.contains(&spec.name.as_str()) {
            ArgValue::Query(params.query_params.clone())
        } else if spec.name == RAW_ALIAS {
            ArgValue::Raw(params.clone())
        } else if let Some(default) = &spec.default {
            ArgValue::Json(default.clone())
        } else {
            tracing::warn!(parameter = %spec.name, "unknown required handler parameter");
            ArgValue::Absent
        };
        args.push(spec.name.clone(), value);
    }
    args
}

/// Parse the body as JSON; non-JSON bodies wrap as `{"raw": <text>}`,
/// an absent body binds an empty object
fn parse_payload(payload: Option<&[u8]>) -> Value {
    let Some(bytes) = payload else {
        return Value::Object(serde_json::Map::new());
    };

    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        serde_json::json!({ "raw": String::from_utf8_lossy(bytes).into_owned() })
    })
}
