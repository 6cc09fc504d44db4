//! Inbound router for provider systems
//!
//! Handlers are registered explicitly per endpoint, then served over an
//! axum router. Each inbound call walks the same path: the reserved
//! `token` query parameter is split off and checked by the installed
//! verifier, the remaining request is bound onto the handler's declared
//! parameter names, and the handler's result is serialized back. A
//! failing handler becomes a JSON error body, never a crashed
//! connection.

pub mod binding;

use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::RawQuery;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, on};
use rustls::RootCertStore;
use rustls::server::WebPkiClientVerifier;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::CoreClient;
use crate::models::{HttpMethod, Service, System, SystemRegistration};
use crate::security::{AcceptAll, Identity, TokenVerifier};
use crate::service::{Params, ServiceHandler};
use crate::{Error, Result};

pub use binding::ParamSpec;

/// Reserved query parameter carrying the capability token
const TOKEN_PARAM: &str = "token";

/// One registered service endpoint
pub struct Endpoint {
    pub service_definition: String,
    pub method: HttpMethod,
    pub uri: String,
    pub params: Vec<ParamSpec>,
    handler: Arc<dyn ServiceHandler>,
}

/// A provider system: its identity on the network plus its handler set
///
/// Composition over inheritance: the provider owns registered endpoints
/// and its own lifecycle; handlers stay plain application values.
pub struct Provider {
    system_name: String,
    address: String,
    port: u16,
    endpoints: Vec<Arc<Endpoint>>,
    verifier: Arc<dyn TokenVerifier>,
}

impl Provider {
    /// A provider reachable at `address:port`, registering under
    /// `system_name`
    #[must_use]
    pub fn new(system_name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            system_name: system_name.into(),
            address: address.into(),
            port,
            endpoints: Vec::new(),
            verifier: Arc::new(AcceptAll),
        }
    }

    /// Install a capability-token verifier, replacing the accept-all
    /// default
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// System name this provider registers under
    #[must_use]
    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// Registered endpoints
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Register a handler for `service_definition` at `(method, uri)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the `(method, uri)` pair is
    /// already taken; duplicates are a configuration error and surface
    /// here, not at request time.
    pub fn register(
        &mut self,
        service_definition: impl Into<String>,
        method: HttpMethod,
        uri: impl Into<String>,
        params: Vec<ParamSpec>,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<()> {
        let service_definition = service_definition.into();
        let uri = uri.into();

        if self
            .endpoints
            .iter()
            .any(|endpoint| endpoint.method == method && endpoint.uri == uri)
        {
            return Err(Error::Config(format!(
                "endpoint {method} {uri} is already registered"
            )));
        }

        tracing::debug!(service = %service_definition, %method, %uri, "registered service");
        self.endpoints.push(Arc::new(Endpoint {
            service_definition,
            method,
            uri,
            params,
            handler,
        }));
        Ok(())
    }

    /// Build the router serving every registered endpoint
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new();

        for endpoint in &self.endpoints {
            let endpoint = Arc::clone(endpoint);
            let verifier = Arc::clone(&self.verifier);
            let uri = endpoint.uri.clone();
            let filter = method_filter(endpoint.method);

            let handler = move |RawQuery(query): RawQuery, body: Bytes| {
                let endpoint = Arc::clone(&endpoint);
                let verifier = Arc::clone(&verifier);
                async move { handle_request(&endpoint, verifier.as_ref(), query, &body).await }
            };

            router = router.route(&uri, on(filter, handler));
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Register this provider's system and services with the registry
    ///
    /// The system's `authenticationInfo` comes from the identity's leaf
    /// certificate when one is supplied.
    pub async fn publish(
        &self,
        core: &CoreClient,
        identity: Option<&Identity>,
    ) -> Result<(System, Vec<Service>)> {
        let registration = SystemRegistration {
            system_name: self.system_name.clone(),
            address: self.address.clone(),
            port: self.port,
            authentication_info: identity
                .map(|identity| identity.authentication_info().to_string())
                .unwrap_or_default(),
            metadata: HashMap::new(),
        };
        let system = core.register_system(&registration).await?;

        let mut services = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let service = core
                .register_service(
                    &system,
                    endpoint.method,
                    &endpoint.service_definition,
                    &endpoint.uri,
                )
                .await?;
            tracing::info!(
                service = %endpoint.service_definition,
                uri = %endpoint.uri,
                "service registered"
            );
            services.push(service);
        }

        Ok((system, services))
    }

    /// Serve over mutual TLS: present the identity's chain, require
    /// client certificates validated against the truststore
    pub async fn serve_tls(&self, identity: &Identity, truststore: &Path) -> Result<()> {
        let config = server_tls_config(identity, truststore)?;
        let addr = self.socket_addr()?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(None);
        });

        tracing::info!(%addr, "starting HTTPS provider endpoint");
        axum_server::bind_rustls(
            addr,
            axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(config)),
        )
        .handle(handle)
        .serve(self.router().into_make_service())
        .await?;
        Ok(())
    }

    /// Serve without TLS; development use only
    pub async fn serve_plain(&self) -> Result<()> {
        let addr = self.socket_addr()?;
        tracing::warn!(%addr, "provider serving PLAINTEXT; development use only");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        (self.address.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                Error::Config(format!("cannot resolve bind address {}", self.address))
            })
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("system_name", &self.system_name)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

/// Receive → Authenticate → Bind Parameters → Invoke → Serialize → Respond
async fn handle_request(
    endpoint: &Endpoint,
    verifier: &dyn TokenVerifier,
    query: Option<String>,
    body: &Bytes,
) -> Response {
    let (query_params, token) = split_token(query.as_deref());

    if let Err(rejected) = verifier
        .verify(&endpoint.service_definition, token.as_deref())
        .await
    {
        tracing::warn!(
            service = %endpoint.service_definition,
            error = %rejected,
            "rejected inbound call"
        );
        return error_response(StatusCode::UNAUTHORIZED, &rejected.to_string());
    }

    let params = Params {
        query_params,
        payload: (!body.is_empty()).then(|| body.to_vec()),
    };
    let args = binding::bind(&endpoint.params, &params);

    match endpoint.handler.handle(args).await {
        Ok(response) => {
            let (content_type, bytes) = response.into_body();
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(error) => {
            tracing::error!(
                service = %endpoint.service_definition,
                error = %error,
                "service handler failed"
            );
            error_response(StatusCode::BAD_REQUEST, &error.to_string())
        }
    }
}

/// Split the query string into the handler-visible map and the reserved
/// token parameter
fn split_token(query: Option<&str>) -> (HashMap<String, String>, Option<String>) {
    let mut params = HashMap::new();
    let mut token = None;

    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == TOKEN_PARAM {
                token = Some(value.into_owned());
            } else {
                params.insert(key.into_owned(), value.into_owned());
            }
        }
    }

    (params, token)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// rustls server config: present the identity chain, require client
/// certificates signed by the truststore
fn server_tls_config(identity: &Identity, truststore: &Path) -> Result<rustls::ServerConfig> {
    let certs = rustls_pemfile::certs(&mut identity.chain_pem())
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::Tls(format!("invalid certificate chain: {e}")))?;

    let key = rustls_pemfile::private_key(&mut identity.key_pem())
        .map_err(|e| Error::Tls(format!("invalid private key: {e}")))?
        .ok_or_else(|| Error::Tls("identity holds no private key".to_string()))?;

    let mut roots = RootCertStore::empty();
    let bundle = std::fs::read(truststore)?;
    for cert in rustls_pemfile::certs(&mut bundle.as_slice()) {
        let cert = cert.map_err(|e| Error::Tls(format!("invalid truststore: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| Error::Tls(format!("cannot add trust anchor: {e}")))?;
    }

    let client_verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| Error::Tls(format!("cannot build client verifier: {e}")))?;

    rustls::ServerConfig::builder()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(format!("cannot assemble server tls config: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
