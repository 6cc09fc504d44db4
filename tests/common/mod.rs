//! Shared test support: a scripted transport double

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;

use arrowhead_client::{HttpTransport, Result, WireRequest, WireResponse};

/// Route test logs through tracing; safe to call from every test
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Transport double replaying canned responses keyed by (method, path)
///
/// Counts calls per route so tests can assert which wire calls happened
/// and, just as importantly, which did not.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(String, String), (u16, String)>>,
    calls: Mutex<HashMap<(String, String), usize>>,
    total: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for `method` requests to `path`
    pub fn route(&self, method: &str, path: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
    }

    /// How many calls hit `method path`
    pub fn calls_to(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total calls across every route
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, request: WireRequest) -> Result<WireResponse> {
        let url = Url::parse(&request.url).expect("test request url must parse");
        let key = (request.method.to_string(), url.path().to_string());

        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let routes = self.routes.lock().unwrap();
        let (status, body) = routes
            .get(&key)
            .unwrap_or_else(|| panic!("unscripted call: {} {}", key.0, key.1));

        Ok(WireResponse {
            status: *status,
            body: body.clone().into_bytes(),
        })
    }
}

