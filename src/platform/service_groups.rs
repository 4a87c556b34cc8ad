//! Service group endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::response::{ApiItem, ItemStatus, ObjectRef};
use super::{Client, ClientError, NO_BODY};

const COLLECTION: &str = "service_groups";

/// A published port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Service {
    /// Public port.
    pub port: i64,
    /// Port inside the instance; defaults to `port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<i64>,
    /// Connection handlers, e.g. `tls`, `http`.
    #[serde(default)]
    pub handlers: Vec<String>,
}

/// A domain to publish a service group under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainRequest {
    /// Subdomain name or fully qualified domain.
    pub name: String,
    /// Certificate for a custom domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<ObjectRef>,
}

/// A published domain as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Domain {
    /// Fully qualified domain name.
    pub fqdn: Option<String>,
    /// Certificate serving the domain.
    pub certificate: Option<ObjectRef>,
}

/// Body of `POST /services`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateServiceGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub services: Vec<Service>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<DomainRequest>,
    /// Concurrent requests per instance before load shedding starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_limit: Option<i64>,
    /// Concurrent requests per instance before requests are refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_limit: Option<i64>,
}

/// A service group as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceGroup {
    #[serde(flatten)]
    pub outcome: ItemStatus,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub persistent: Option<bool>,
    pub soft_limit: Option<i64>,
    pub hard_limit: Option<i64>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub instances: Vec<ObjectRef>,
}

impl ApiItem for ServiceGroup {
    fn item_status(&self) -> &ItemStatus {
        &self.outcome
    }
}

impl Client {
    /// Create a service group.
    pub async fn create_service_group(
        &self,
        request: &CreateServiceGroupRequest,
    ) -> Result<ServiceGroup, ClientError> {
        self.item(Method::POST, &["services"], Some(request), COLLECTION)
            .await
    }

    /// Get a service group by UUID.
    pub async fn get_service_group(&self, uuid: &str) -> Result<ServiceGroup, ClientError> {
        self.item(Method::GET, &["services", uuid], NO_BODY, COLLECTION).await
    }

    /// Get a service group by name.
    pub async fn get_service_group_by_name(
        &self,
        name: &str,
    ) -> Result<ServiceGroup, ClientError> {
        self.item(
            Method::GET,
            &["services"],
            Some(&[ObjectRef::by_name(name)]),
            COLLECTION,
        )
        .await
    }

    /// List all service groups. Only `uuid` and `name` are populated.
    pub async fn list_service_groups(&self) -> Result<Vec<ServiceGroup>, ClientError> {
        self.items(Method::GET, &["services"], NO_BODY, COLLECTION)
            .await
    }

    /// Delete a service group by UUID.
    pub async fn delete_service_group(&self, uuid: &str) -> Result<ServiceGroup, ClientError> {
        self.item(Method::DELETE, &["services", uuid], NO_BODY, COLLECTION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request() {
        let request = CreateServiceGroupRequest {
            name: Some("edge".to_string()),
            services: vec![Service {
                port: 80,
                destination_port: None,
                handlers: vec!["http".to_string()],
            }],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "edge",
                "services": [{"port": 80, "handlers": ["http"]}]
            })
        );
    }

    #[test]
    fn test_service_group_deserialization() {
        let group: ServiceGroup = serde_json::from_value(json!({
            "status": "success",
            "uuid": "sg-1",
            "name": "edge",
            "services": [{"port": 443, "destination_port": 8080, "handlers": ["tls", "http"]}],
            "domains": [{"fqdn": "edge.fra0.kraft.host"}],
            "instances": [{"uuid": "i-1", "name": "web"}]
        }))
        .unwrap();

        assert_eq!(group.services[0].destination_port, Some(8080));
        assert_eq!(group.instances[0].name.as_deref(), Some("web"));
        assert_eq!(group.soft_limit, None);
    }
}
