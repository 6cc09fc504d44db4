//! Arrowhead client SDK — secure dispatch for a service-oriented IoT cloud
//!
//! This library covers the secure dispatch path of an Arrowhead local
//! cloud:
//! - Mutual-TLS identity bootstrapped from a PKCS#12 keystore
//! - Typed gateways over the registry, orchestrator, and authorization
//!   core services
//! - Orchestration: service-definition name → authenticated provider
//! - Token-bearing dispatch to the matched provider
//! - The symmetric provider-side router for inbound calls
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  Core services                       │
//! │   Registry   │   Orchestrator   │   Authorization    │
//! └──────────────────────┬───────────────────────────────┘
//!                        │ mutual TLS
//! ┌──────────────────────▼───────────────────────────────┐
//! │                   CoreClient                         │
//! │   register  │  orchestrate  │  authorize  │ consume  │
//! └──────────────────────┬───────────────────────────────┘
//!                        │ capability token
//! ┌──────────────────────▼───────────────────────────────┐
//! │      Dispatcher ──────────────▶ Provider router      │
//! │   token as query param      bind → invoke → reply    │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod orchestration;
pub mod provider;
pub mod security;
pub mod service;
pub mod transport;

pub use client::CoreClient;
pub use config::{Config, CoreEndpoint};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use models::{
    HttpMethod, MatchedService, OrchestrationFlags, OrchestrationRequest, RequesterSystem,
    SECURE_JSON_INTERFACE, Service, System, SystemRegistration, TOKEN_SECURITY,
};
pub use orchestration::OrchestrationBuilder;
pub use provider::{ParamSpec, Provider};
pub use security::{AcceptAll, Identity, JwtVerifier, TokenVerifier};
pub use service::{ArgValue, Args, HandlerError, Params, ServiceHandler, ServiceResponse};
pub use transport::{HttpTransport, Transport, WireRequest, WireResponse};
