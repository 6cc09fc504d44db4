//! Wire models for the registry, orchestrator, and authorization APIs
//!
//! Field names on the wire are camelCase; the structs keep snake_case
//! semantic names and map via serde renames. The mapping must be
//! preserved exactly for interoperability with the core servers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Interface designator for token-secured JSON services
pub const SECURE_JSON_INTERFACE: &str = "HTTP-SECURE-JSON";

/// Security mode requiring a capability token
pub const TOKEN_SECURITY: &str = "TOKEN";

/// Metadata key carrying the HTTP method a service is reached with
pub const HTTP_METHOD_KEY: &str = "http-method";

/// HTTP methods accepted for service registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::Config(format!("unsupported http method: {other}"))),
        }
    }
}

/// System registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRegistration {
    pub system_name: String,
    pub address: String,
    pub port: u16,
    pub authentication_info: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A system known to the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub id: i64,
    pub system_name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub authentication_info: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, with = "registry_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Paged system listing
#[derive(Debug, Clone, Deserialize)]
pub struct SystemList {
    pub data: Vec<System>,
    pub count: i64,
}

/// Provider identity embedded in a service registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSystem {
    pub system_name: String,
    pub address: String,
    pub port: u16,
    pub authentication_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// A registered service definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub id: i64,
    pub service_definition: String,
    #[serde(default, with = "registry_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A provider system as the registry and orchestrator return it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: i64,
    pub system_name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub authentication_info: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, with = "registry_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A wire-format interface designator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: i64,
    pub interface_name: String,
    #[serde(default, with = "registry_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Service registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistration {
    pub end_of_validity: String,
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub provider_system: ProviderSystem,
    pub secure: String,
    pub service_definition: String,
    pub service_uri: String,
    pub version: String,
}

/// A service bound to its provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub service_definition: ServiceDefinition,
    pub provider: Provider,
    pub service_uri: String,
    pub secure: String,
    pub version: i32,
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, with = "registry_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub end_of_validity: Option<DateTime<Utc>>,
}

/// Paged service listing
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceList {
    pub data: Vec<Service>,
    pub count: i64,
}

/// Intra-cloud authorization creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub consumer_id: i64,
    pub provider_ids: Vec<i64>,
    pub interface_ids: Vec<i64>,
    pub service_definition_ids: Vec<i64>,
}

/// An intra-cloud authorization rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: i64,
    pub consumer_system: System,
    pub provider_system: Provider,
    pub service_definition: ServiceDefinition,
    pub interfaces: Vec<Interface>,
    #[serde(default, with = "registry_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "registry_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Paged authorization listing
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationList {
    pub data: Vec<Authorization>,
    pub count: i64,
}

/// Requester identity inside an orchestration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterSystem {
    pub system_name: String,
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Behavioral flags steering how the orchestrator resolves a request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationFlags {
    #[serde(default)]
    pub only_preferred: bool,
    #[serde(default)]
    pub override_store: bool,
    #[serde(default)]
    pub external_service_request: bool,
    #[serde(default)]
    pub enable_inter_cloud: bool,
    #[serde(default, rename = "enableQoS")]
    pub enable_qos: bool,
    #[serde(default)]
    pub matchmaking: bool,
    #[serde(default)]
    pub metadata_search: bool,
    #[serde(default)]
    pub trigger_inter_cloud: bool,
    #[serde(default)]
    pub ping_providers: bool,
}

impl OrchestrationFlags {
    /// Flags for a dynamic lookup: matchmaking on, static store overridden,
    /// so a fresh resolution is always performed
    #[must_use]
    pub fn dynamic() -> Self {
        Self {
            matchmaking: true,
            override_store: true,
            ..Self::default()
        }
    }
}

/// A neighboring cloud (wire fidelity only; inter-cloud relay is out of scope)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cloud {
    pub authentication_info: String,
    pub gatekeeper_relay_ids: Vec<i64>,
    pub gateway_relay_ids: Vec<i64>,
    pub name: String,
    pub neighbor: bool,
    pub operator: String,
    pub secure: bool,
}

/// Preferred provider hint for orchestration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_cloud: Option<Cloud>,
    pub provider_system: System,
}

/// The service a requester wants resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedService {
    pub interface_requirements: Vec<String>,
    pub security_requirements: Vec<String>,
    pub service_definition_requirement: String,
    #[serde(default)]
    pub metadata_requirements: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version_requirement: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version_requirement: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_requirement: Option<i32>,
    #[serde(default)]
    pub ping_providers: bool,
}

/// Orchestration request, built fresh per call and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    pub requester_system: RequesterSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_cloud: Option<Cloud>,
    pub requested_service: RequestedService,
    pub orchestration_flags: OrchestrationFlags,
    #[serde(default)]
    pub preferred_providers: Vec<PreferredProvider>,
    #[serde(default)]
    pub commands: HashMap<String, String>,
    #[serde(default)]
    pub qos_requirements: HashMap<String, String>,
}

/// A candidate provider returned by orchestration
///
/// The token map keyed by interface name is the only artifact that
/// authorizes the follow-up call to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedService {
    pub provider: Provider,
    #[serde(rename = "service")]
    pub service_definition: ServiceDefinition,
    pub service_uri: String,
    pub secure: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub interfaces: Vec<Interface>,
    pub version: i32,
    #[serde(default)]
    pub authorization_tokens: HashMap<String, String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Orchestrator response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestrationResponse {
    pub response: Vec<MatchedService>,
}

/// Structured error body the core services return on failure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreErrorBody {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<i32>,
    #[serde(default)]
    pub exception_type: Option<String>,
}

/// Registry timestamps: legacy deployments emit `2020-09-11 10:39:08`,
/// newer ones RFC 3339. Accept both, emit the legacy format.
mod registry_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else { return Ok(None) };
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(&raw, FORMAT) {
            return Ok(Some(ts.and_utc()));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_parses_legacy_timestamp() {
        let json = r#"{
            "id": 7,
            "systemName": "carfactory",
            "address": "10.0.0.5",
            "port": 8080,
            "authenticationInfo": "MIIBIjAN",
            "createdAt": "2020-09-11 10:39:08",
            "updatedAt": "2020-09-11 10:39:08"
        }"#;

        let system: System = serde_json::from_str(json).unwrap();
        assert_eq!(system.system_name, "carfactory");
        assert_eq!(system.port, 8080);
        assert!(system.created_at.is_some());
    }

    #[test]
    fn test_system_parses_rfc3339_timestamp() {
        let json = r#"{
            "id": 7,
            "systemName": "carfactory",
            "address": "10.0.0.5",
            "port": 8080,
            "createdAt": "2020-09-11T10:39:08Z"
        }"#;

        let system: System = serde_json::from_str(json).unwrap();
        assert!(system.created_at.is_some());
        assert!(system.updated_at.is_none());
    }

    #[test]
    fn test_flags_wire_names() {
        let flags = OrchestrationFlags::dynamic();
        let json = serde_json::to_value(&flags).unwrap();

        assert_eq!(json["matchmaking"], true);
        assert_eq!(json["overrideStore"], true);
        assert_eq!(json["onlyPreferred"], false);
        // QoS keeps its capitalization on the wire
        assert_eq!(json["enableQoS"], false);
    }

    #[test]
    fn test_matched_service_uses_service_alias() {
        let json = r#"{
            "provider": {
                "id": 3,
                "systemName": "carfactory",
                "address": "10.0.0.5",
                "port": 8080
            },
            "service": {"id": 11, "serviceDefinition": "create-car"},
            "serviceUri": "/car-factory/create-car",
            "secure": "TOKEN",
            "interfaces": [{"id": 1, "interfaceName": "HTTP-SECURE-JSON"}],
            "version": 1,
            "authorizationTokens": {"HTTP-SECURE-JSON": "eyJ0eXAi"}
        }"#;

        let matched: MatchedService = serde_json::from_str(json).unwrap();
        assert_eq!(matched.service_definition.service_definition, "create-car");
        assert_eq!(
            matched.authorization_tokens.get(SECURE_JSON_INTERFACE),
            Some(&"eyJ0eXAi".to_string())
        );
    }

    #[test]
    fn test_empty_orchestration_response() {
        let response: OrchestrationResponse = serde_json::from_str(r#"{"response": []}"#).unwrap();
        assert!(response.response.is_empty());
    }

    #[test]
    fn test_http_method_round_trip() {
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_registration_serializes_camel_case() {
        let reg = SystemRegistration {
            system_name: "consumer1".to_string(),
            address: "127.0.0.1".to_string(),
            port: 4200,
            authentication_info: String::new(),
            metadata: HashMap::new(),
        };

        let json = serde_json::to_value(&reg).unwrap();
        assert!(json.get("systemName").is_some());
        assert!(json.get("authenticationInfo").is_some());
        assert!(json.get("system_name").is_none());
    }
}
