//! Orchestration: turn a service-definition name into matched providers
//!
//! The builder fills in the defaults that make orchestration resolve
//! dynamically; the engine submits the request and hands back whatever
//! the orchestrator matched. Result ordering is server-determined and
//! not re-ranked here.

use std::collections::HashMap;

use reqwest::Method;

use crate::client::CoreClient;
use crate::dispatch::Dispatcher;
use crate::models::{
    MatchedService, OrchestrationFlags, OrchestrationRequest, OrchestrationResponse,
    PreferredProvider, RequestedService, RequesterSystem, SECURE_JSON_INTERFACE, TOKEN_SECURITY,
};
use crate::service::Params;
use crate::{Error, Result};

/// Builds an [`OrchestrationRequest`] with dynamic-lookup defaults
///
/// Unless overridden, the request asks for the token-secured JSON
/// interface and carries the `matchmaking` and `overrideStore` flags so
/// a fresh resolution is always performed.
#[derive(Debug, Clone)]
pub struct OrchestrationBuilder {
    requester: RequesterSystem,
    service_definition: String,
    interface_requirements: Option<Vec<String>>,
    security_requirements: Option<Vec<String>>,
    metadata_requirements: HashMap<String, String>,
    preferred_providers: Vec<PreferredProvider>,
    flags: Option<OrchestrationFlags>,
}

impl OrchestrationBuilder {
    /// Start a request for `service_definition` on behalf of `requester`
    #[must_use]
    pub fn new(requester: RequesterSystem, service_definition: impl Into<String>) -> Self {
        Self {
            requester,
            service_definition: service_definition.into(),
            interface_requirements: None,
            security_requirements: None,
            metadata_requirements: HashMap::new(),
            preferred_providers: Vec::new(),
            flags: None,
        }
    }

    /// Replace the interface requirements
    #[must_use]
    pub fn interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interface_requirements = Some(interfaces);
        self
    }

    /// Replace the security requirements
    #[must_use]
    pub fn security(mut self, security: Vec<String>) -> Self {
        self.security_requirements = Some(security);
        self
    }

    /// Add a metadata constraint
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata_requirements.insert(key.into(), value.into());
        self
    }

    /// Hint a preferred provider; the orchestrator decides whether to
    /// honor it
    #[must_use]
    pub fn prefer(mut self, provider: PreferredProvider) -> Self {
        self.preferred_providers.push(provider);
        self
    }

    /// Replace the behavioral flags
    #[must_use]
    pub fn flags(mut self, flags: OrchestrationFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Finish the request, applying defaults for anything unset
    #[must_use]
    pub fn build(self) -> OrchestrationRequest {
        OrchestrationRequest {
            requester_system: self.requester,
            requester_cloud: None,
            requested_service: RequestedService {
                interface_requirements: self
                    .interface_requirements
                    .unwrap_or_else(|| vec![SECURE_JSON_INTERFACE.to_string()]),
                security_requirements: self
                    .security_requirements
                    .unwrap_or_else(|| vec![TOKEN_SECURITY.to_string()]),
                service_definition_requirement: self.service_definition,
                metadata_requirements: self.metadata_requirements,
                min_version_requirement: None,
                max_version_requirement: None,
                version_requirement: None,
                ping_providers: false,
            },
            orchestration_flags: self.flags.unwrap_or_else(OrchestrationFlags::dynamic),
            preferred_providers: self.preferred_providers,
            commands: HashMap::new(),
            qos_requirements: HashMap::new(),
        }
    }
}

impl CoreClient {
    /// Submit an orchestration request
    ///
    /// An empty match list is not an error; it signals that no provider
    /// currently satisfies the request, and callers can tell it apart
    /// from a transport failure.
    pub async fn orchestrate(
        &self,
        request: &OrchestrationRequest,
    ) -> Result<Vec<MatchedService>> {
        let response = self
            .call(
                "orchestrate",
                Method::POST,
                self.orchestrator_url("/orchestration"),
                Some(serde_json::to_vec(request)?),
                200,
            )
            .await?;

        let parsed: OrchestrationResponse = response.json()?;
        tracing::debug!(
            service = %request.requested_service.service_definition_requirement,
            matches = parsed.response.len(),
            "orchestration completed"
        );
        Ok(parsed.response)
    }

    /// Orchestrate with defaults and dispatch to the first match
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the orchestrator matched no
    /// provider for `service_definition`.
    pub async fn consume(
        &self,
        requester: &RequesterSystem,
        service_definition: &str,
        params: Params,
    ) -> Result<Vec<u8>> {
        let request = OrchestrationBuilder::new(requester.clone(), service_definition).build();
        let matches = self.orchestrate(&request).await?;

        let Some(matched) = matches.first() else {
            return Err(Error::NotFound(format!(
                "no provider matched service '{service_definition}'"
            )));
        };

        let dispatcher = Dispatcher::new(
            self.transport(),
            self.config().tls,
            self.timeout(),
        );
        dispatcher
            .send(matched, &params.query_params, params.payload)
            .await
    }
}
