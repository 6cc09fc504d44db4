//! Registry management operations: systems and services

use reqwest::Method;

use crate::models::{
    HTTP_METHOD_KEY, HttpMethod, ProviderSystem, SECURE_JSON_INTERFACE, Service, ServiceList,
    ServiceRegistration, System, SystemList, SystemRegistration, TOKEN_SECURITY,
};
use crate::{Error, Result};

use super::CoreClient;

impl CoreClient {
    /// Register a system with the service registry
    pub async fn register_system(&self, registration: &SystemRegistration) -> Result<System> {
        let response = self
            .call(
                "register system",
                Method::POST,
                self.registry_url("/mgmt/systems"),
                Some(serde_json::to_vec(registration)?),
                201,
            )
            .await?;
        response.json()
    }

    /// Remove a system from the registry by id
    pub async fn unregister_system(&self, system_id: i64) -> Result<()> {
        self.call(
            "unregister system",
            Method::DELETE,
            self.registry_url(&format!("/mgmt/systems/{system_id}")),
            None,
            200,
        )
        .await?;
        Ok(())
    }

    /// All registered systems, in registry id order
    pub async fn systems(&self) -> Result<Vec<System>> {
        let response = self
            .call(
                "list systems",
                Method::GET,
                self.registry_url("/mgmt/systems?direction=ASC&sort_field=id"),
                None,
                200,
            )
            .await?;
        let list: SystemList = response.json()?;
        Ok(list.data)
    }

    /// Fetch a system by id
    pub async fn system_by_id(&self, system_id: i64) -> Result<System> {
        let response = self
            .call(
                "get system",
                Method::GET,
                self.registry_url(&format!("/mgmt/systems/{system_id}")),
                None,
                200,
            )
            .await?;
        response.json()
    }

    /// Find a system by exact name
    ///
    /// The registry has no exact-match endpoint, so this lists and
    /// filters; it reflects the eventual consistency of the listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no system carries the name.
    pub async fn system_by_name(&self, name: &str) -> Result<System> {
        let systems = self.systems().await?;
        systems
            .into_iter()
            .find(|system| system.system_name == name)
            .ok_or_else(|| Error::NotFound(format!("system '{name}'")))
    }

    /// Register a service for `system`, reachable with `method` at `uri`
    ///
    /// The service is announced token-secured on the JSON interface,
    /// version 1, with the HTTP method recorded in its metadata.
    pub async fn register_service(
        &self,
        system: &System,
        method: HttpMethod,
        service_definition: &str,
        service_uri: &str,
    ) -> Result<Service> {
        let registration = ServiceRegistration {
            end_of_validity: String::new(),
            interfaces: vec![SECURE_JSON_INTERFACE.to_string()],
            metadata: [(HTTP_METHOD_KEY.to_string(), method.to_string())]
                .into_iter()
                .collect(),
            provider_system: ProviderSystem {
                system_name: system.system_name.clone(),
                address: system.address.clone(),
                port: system.port,
                authentication_info: system.authentication_info.clone().unwrap_or_default(),
                metadata: system.metadata.clone(),
            },
            secure: TOKEN_SECURITY.to_string(),
            service_definition: service_definition.to_string(),
            service_uri: service_uri.to_string(),
            version: "1".to_string(),
        };

        let response = self
            .call(
                "register service",
                Method::POST,
                self.registry_url("/mgmt/services"),
                Some(serde_json::to_vec(&registration)?),
                201,
            )
            .await?;
        response.json()
    }

    /// Remove a service from the registry by id
    pub async fn unregister_service(&self, service_id: i64) -> Result<()> {
        self.call(
            "unregister service",
            Method::DELETE,
            self.registry_url(&format!("/mgmt/services/{service_id}")),
            None,
            200,
        )
        .await?;
        Ok(())
    }

    /// All registered services, in registry id order
    pub async fn services(&self) -> Result<Vec<Service>> {
        let response = self
            .call(
                "list services",
                Method::GET,
                self.registry_url("/mgmt/services?direction=ASC&sort_field=id"),
                None,
                200,
            )
            .await?;
        let list: ServiceList = response.json()?;
        Ok(list.data)
    }

    /// Fetch a service by id
    pub async fn service_by_id(&self, service_id: i64) -> Result<Service> {
        let response = self
            .call(
                "get service",
                Method::GET,
                self.registry_url(&format!("/mgmt/services/{service_id}")),
                None,
                200,
            )
            .await?;
        response.json()
    }

    /// Ids of `service_definition` entries the provider offers
    pub async fn service_definition_ids_for_provider(
        &self,
        provider_id: i64,
        service_definition: &str,
    ) -> Result<Vec<i64>> {
        let services = self.services().await?;
        Ok(services
            .iter()
            .filter(|service| {
                service.provider.id == provider_id
                    && service.service_definition.service_definition == service_definition
            })
            .map(|service| service.service_definition.id)
            .collect())
    }

    /// Ids of every interface the provider exposes, across all its services
    pub async fn interface_ids_for_provider(&self, provider_id: i64) -> Result<Vec<i64>> {
        let services = self.services().await?;
        let mut interface_ids = Vec::new();
        for service in services
            .iter()
            .filter(|service| service.provider.id == provider_id)
        {
            for interface in &service.interfaces {
                if !interface_ids.contains(&interface.id) {
                    interface_ids.push(interface.id);
                }
            }
        }
        Ok(interface_ids)
    }
}
