//! Instance endpoints.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::response::{ApiItem, ItemStatus, ObjectRef};
use super::service_groups::{Domain, DomainRequest, Service};
use super::{Client, ClientError, NO_BODY};
use crate::sse::EventReceiver;

const COLLECTION: &str = "instances";

/// Body of `POST /instances`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateInstanceRequest {
    /// Image reference, e.g. `nginx:latest`.
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autostart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_group: Option<InstanceServiceGroupRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<InstanceVolume>>,
    /// Block until the instance reaches `running`, up to this many
    /// milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timeout_ms: Option<i64>,
}

/// Service group attached to a new instance: either an existing group or
/// an inline definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceServiceGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<DomainRequest>,
}

/// An instance as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Instance {
    #[serde(flatten)]
    pub outcome: ItemStatus,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub state: Option<String>,
    pub image: Option<String>,
    pub memory_mb: Option<i64>,
    pub vcpus: Option<i64>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub fqdn: Option<String>,
    pub private_fqdn: Option<String>,
    pub private_ip: Option<String>,
    pub boot_time_us: Option<i64>,
    pub service_group: Option<InstanceServiceGroup>,
    #[serde(default)]
    pub volumes: Vec<InstanceVolume>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl ApiItem for Instance {
    fn item_status(&self) -> &ItemStatus {
        &self.outcome
    }
}

/// The service group an instance belongs to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InstanceServiceGroup {
    pub uuid: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub domains: Vec<Domain>,
}

/// A volume mount on an instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InstanceVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Mount point inside the instance.
    pub at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NetworkInterface {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub private_ip: Option<String>,
    pub mac: Option<String>,
}

impl Client {
    /// Create an instance.
    pub async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Instance, ClientError> {
        self.item(Method::POST, &["instances"], Some(request), COLLECTION)
            .await
    }

    /// Get an instance by UUID.
    pub async fn get_instance(&self, uuid: &str) -> Result<Instance, ClientError> {
        self.item(Method::GET, &["instances", uuid], NO_BODY, COLLECTION).await
    }

    /// Get the full description of several instances by UUID or name.
    pub async fn get_instances(&self, refs: &[ObjectRef]) -> Result<Vec<Instance>, ClientError> {
        self.items(Method::GET, &["instances"], Some(refs), COLLECTION)
            .await
    }

    /// Get an instance by name.
    pub async fn get_instance_by_name(&self, name: &str) -> Result<Instance, ClientError> {
        self.item(
            Method::GET,
            &["instances"],
            Some(&[ObjectRef::by_name(name)]),
            COLLECTION,
        )
        .await
    }

    /// List all instances. Only `uuid` and `name` are populated.
    pub async fn list_instances(&self) -> Result<Vec<Instance>, ClientError> {
        self.items(Method::GET, &["instances"], NO_BODY, COLLECTION)
            .await
    }

    /// Delete an instance by UUID.
    pub async fn delete_instance(&self, uuid: &str) -> Result<Instance, ClientError> {
        self.item(Method::DELETE, &["instances", uuid], NO_BODY, COLLECTION).await
    }

    /// Follow the console output of an instance as an event stream.
    pub async fn follow_instance_logs(&self, uuid: &str) -> Result<EventReceiver, ClientError> {
        let mut url = self.endpoint(&["instances", uuid, "log"]);
        url.query_pairs_mut().append_pair("follow", "true");
        self.request_events(Method::GET, url, NO_BODY).await
    }
}
