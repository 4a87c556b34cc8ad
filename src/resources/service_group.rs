//! `unikraft-cloud_service_group`: published ports and domains shared by
//! instances.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{created_uuid, decode, non_empty, object_ref, reconcile, Resource, SERVICE_GROUP};
use crate::error::ProviderError;
use crate::platform::{
    Client, CreateServiceGroupRequest, DomainRequest, ObjectRef, Service, ServiceGroup,
};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};

/// The service group resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceGroupResource;

/// One element of a `services` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ServiceConfig {
    port: i64,
    destination_port: Option<i64>,
    handlers: Option<Vec<String>>,
}

impl From<ServiceConfig> for Service {
    fn from(config: ServiceConfig) -> Self {
        Service {
            port: config.port,
            destination_port: config.destination_port,
            handlers: config.handlers.unwrap_or_default(),
        }
    }
}

/// One element of a `domains` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DomainConfig {
    name: String,
    certificate: Option<String>,
}

impl From<DomainConfig> for DomainRequest {
    fn from(config: DomainConfig) -> Self {
        DomainRequest {
            name: config.name,
            certificate: config.certificate.as_deref().map(object_ref),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceGroupConfig {
    name: Option<String>,
    soft_limit: Option<i64>,
    hard_limit: Option<i64>,
    services: Option<Vec<ServiceConfig>>,
    domains: Option<Vec<DomainConfig>>,
}

impl From<ServiceGroupConfig> for CreateServiceGroupRequest {
    fn from(config: ServiceGroupConfig) -> Self {
        CreateServiceGroupRequest {
            name: config.name,
            services: config
                .services
                .unwrap_or_default()
                .into_iter()
                .map(Service::from)
                .collect(),
            domains: config
                .domains
                .unwrap_or_default()
                .into_iter()
                .map(DomainRequest::from)
                .collect(),
            soft_limit: config.soft_limit,
            hard_limit: config.hard_limit,
        }
    }
}

/// Schema of a `services` block element.
pub(crate) fn services_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_description("A port published by the service group.")
            .with_attribute(
                "port",
                Attribute::required_int64().with_description("Public port."),
            )
            .with_attribute(
                "destination_port",
                Attribute::optional_int64()
                    .with_description("Port inside the instance. Defaults to `port`."),
            )
            .with_attribute(
                "handlers",
                Attribute::of(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                )
                .with_description("Connection handlers, e.g. `tls` and `http`."),
            ),
    )
    .with_force_new()
}

/// Schema of a `domains` block element.
pub(crate) fn domains_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_description("A domain the service group is reachable under.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Subdomain or fully qualified domain name."),
            )
            .with_attribute(
                "certificate",
                Attribute::optional_string()
                    .with_description("UUID or name of the certificate for a custom domain."),
            ),
    )
    .with_force_new()
}

/// Schema of the service group resource.
pub(crate) fn service_group_schema() -> Schema {
    Schema::v0()
        .with_description("A Unikraft Cloud service group.")
        .with_attribute("uuid", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute("persistent", Attribute::computed_bool())
        .with_attribute(
            "fqdns",
            Attribute::of(
                AttributeType::list(AttributeType::String),
                AttributeFlags::computed(),
            )
            .with_description("Fully qualified domain names the group is published under."),
        )
        .with_attribute(
            "instances",
            Attribute::of(
                AttributeType::list(AttributeType::String),
                AttributeFlags::computed(),
            )
            .with_description("UUIDs of the instances attached to the group."),
        )
        .with_attribute(
            "name",
            Attribute::optional_computed_string().with_force_new(),
        )
        .with_attribute(
            "soft_limit",
            Attribute::optional_computed_int64()
                .with_force_new()
                .with_description("Concurrent requests per instance before load shedding."),
        )
        .with_attribute(
            "hard_limit",
            Attribute::optional_computed_int64()
                .with_force_new()
                .with_description("Concurrent requests per instance before refusing."),
        )
        .with_block("services", services_block().with_min_items(1))
        .with_block("domains", domains_block())
}

/// The API-owned part of a service group state.
pub(crate) fn service_group_state(group: &ServiceGroup) -> Map<String, Value> {
    let fqdns: Vec<&str> = group
        .domains
        .iter()
        .filter_map(|d| d.fqdn.as_deref())
        .collect();
    let instances: Vec<&str> = group
        .instances
        .iter()
        .filter_map(|i| i.uuid.as_deref())
        .collect();
    let services: Vec<Value> = group
        .services
        .iter()
        .map(|s| {
            json!({
                "port": s.port,
                "destination_port": s.destination_port,
                "handlers": non_empty(json!(s.handlers)),
            })
        })
        .collect();

    let mut state = Map::new();
    state.insert("uuid".to_string(), json!(group.uuid));
    state.insert("name".to_string(), json!(group.name));
    state.insert("created_at".to_string(), json!(group.created_at));
    state.insert("persistent".to_string(), json!(group.persistent));
    state.insert("soft_limit".to_string(), json!(group.soft_limit));
    state.insert("hard_limit".to_string(), json!(group.hard_limit));
    state.insert("fqdns".to_string(), non_empty(json!(fqdns)));
    state.insert("instances".to_string(), non_empty(json!(instances)));
    state.insert("services".to_string(), non_empty(json!(services)));
    state
}

#[async_trait::async_trait]
impl Resource for ServiceGroupResource {
    fn type_name(&self) -> &'static str {
        SERVICE_GROUP
    }

    fn schema(&self) -> Schema {
        service_group_schema()
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<String, ProviderError> {
        let request = CreateServiceGroupRequest::from(decode::<ServiceGroupConfig>(planned)?);
        debug!(services = request.services.len(), "creating service group");
        let group = client
            .create_service_group(&request)
            .await
            .map_err(|e| ProviderError::client("create service group", e))?;
        created_uuid(group.uuid, "service group")
    }

    async fn get(
        &self,
        client: &Client,
        uuid: &str,
        prior: &Value,
    ) -> Result<Value, ProviderError> {
        let group = client
            .get_service_group(uuid)
            .await
            .map_err(|e| ProviderError::client("read service group", e))?;
        Ok(reconcile(
            &service_group_schema(),
            service_group_state(&group),
            prior,
        ))
    }

    async fn delete(&self, client: &Client, uuid: &str) -> Result<(), ProviderError> {
        client
            .delete_service_group(uuid)
            .await
            .map(drop)
            .map_err(|e| ProviderError::client("delete service group", e))
    }
}

/// Reference to an existing group from an instance `service_group` block.
pub(crate) fn existing_group_ref(uuid: Option<&str>, name: Option<&str>) -> Option<ObjectRef> {
    match (uuid, name) {
        (Some(uuid), _) if !uuid.is_empty() => Some(ObjectRef::by_uuid(uuid)),
        (_, Some(name)) if !name.is_empty() => Some(ObjectRef::by_name(name)),
        _ => None,
    }
}
