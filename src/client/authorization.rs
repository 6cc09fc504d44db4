//! Intra-cloud authorization operations

use reqwest::Method;

use crate::models::{Authorization, AuthorizationList, AuthorizationRequest};
use crate::{Error, Result};

use super::CoreClient;

impl CoreClient {
    /// Authorize `consumer_name` to consume `service_definition` from
    /// `provider_name`
    ///
    /// Compound operation: both systems are resolved by name, then the
    /// service-definition ids and the provider's full interface-id set
    /// (across all its services) are gathered, and only then is the rule
    /// created. A provider with no interfaces short-circuits before the
    /// creation call, so no rule with an empty interface set can exist.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when a system or the service definition is
    /// absent, [`Error::NoInterfaces`] when the provider exposes none.
    pub async fn add_authorization(
        &self,
        consumer_name: &str,
        provider_name: &str,
        service_definition: &str,
    ) -> Result<Authorization> {
        let consumer = self.system_by_name(consumer_name).await?;
        let provider = self.system_by_name(provider_name).await?;

        let service_definition_ids = self
            .service_definition_ids_for_provider(provider.id, service_definition)
            .await?;
        if service_definition_ids.is_empty() {
            return Err(Error::NotFound(format!(
                "service definition '{service_definition}' for provider '{provider_name}'"
            )));
        }

        let interface_ids = self.interface_ids_for_provider(provider.id).await?;
        if interface_ids.is_empty() {
            return Err(Error::NoInterfaces(provider_name.to_string()));
        }

        let request = AuthorizationRequest {
            consumer_id: consumer.id,
            provider_ids: vec![provider.id],
            interface_ids,
            service_definition_ids,
        };

        let response = self
            .call(
                "add authorization",
                Method::POST,
                self.authorization_url("/mgmt/intracloud"),
                Some(serde_json::to_vec(&request)?),
                201,
            )
            .await?;

        let list: AuthorizationList = response.json()?;
        list.data.into_iter().next().ok_or(Error::Gateway {
            operation: "add authorization",
            status: 201,
            detail: "authorization system returned an empty rule list".to_string(),
        })
    }

    /// All intra-cloud authorization rules, in id order
    pub async fn authorizations(&self) -> Result<Vec<Authorization>> {
        let response = self
            .call(
                "list authorizations",
                Method::GET,
                self.authorization_url("/mgmt/intracloud?direction=ASC&sort_field=id"),
                None,
                200,
            )
            .await?;
        let list: AuthorizationList = response.json()?;
        Ok(list.data)
    }

    /// Remove an authorization rule by id
    pub async fn remove_authorization(&self, authorization_id: i64) -> Result<()> {
        self.call(
            "remove authorization",
            Method::DELETE,
            self.authorization_url(&format!("/mgmt/intracloud/{authorization_id}")),
            None,
            200,
        )
        .await?;
        Ok(())
    }
}
