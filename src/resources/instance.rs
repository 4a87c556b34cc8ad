//! `unikraft-cloud_instance`: a unikernel instance running an image.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::service_group::{domains_block, existing_group_ref, services_block};
use super::service_group::{DomainConfig, ServiceConfig};
use super::{created_uuid, decode, non_empty, reconcile, Resource, INSTANCE};
use crate::error::ProviderError;
use crate::platform::{
    Client, CreateInstanceRequest, DomainRequest, Instance, InstanceServiceGroupRequest,
    InstanceVolume, Service,
};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};

/// The instance resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceResource;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstanceConfig {
    image: String,
    name: Option<String>,
    args: Option<Vec<String>>,
    env: Option<BTreeMap<String, String>>,
    memory_mb: Option<i64>,
    vcpus: Option<i64>,
    autostart: Option<bool>,
    features: Option<Vec<String>>,
    wait_timeout_ms: Option<i64>,
    service_group: Option<ServiceGroupConfig>,
    volumes: Option<Vec<VolumeMountConfig>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceGroupConfig {
    uuid: Option<String>,
    name: Option<String>,
    services: Option<Vec<ServiceConfig>>,
    domains: Option<Vec<DomainConfig>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VolumeMountConfig {
    uuid: Option<String>,
    name: Option<String>,
    at: String,
    readonly: Option<bool>,
}

impl From<InstanceConfig> for CreateInstanceRequest {
    fn from(config: InstanceConfig) -> Self {
        let service_group = config.service_group.map(|group| {
            let existing = existing_group_ref(group.uuid.as_deref(), group.name.as_deref())
                .unwrap_or_default();
            InstanceServiceGroupRequest {
                uuid: existing.uuid,
                name: existing.name,
                services: group
                    .services
                    .unwrap_or_default()
                    .into_iter()
                    .map(Service::from)
                    .collect(),
                domains: group
                    .domains
                    .unwrap_or_default()
                    .into_iter()
                    .map(DomainRequest::from)
                    .collect(),
            }
        });
        let volumes = config.volumes.map(|mounts| {
            mounts
                .into_iter()
                .map(|mount| InstanceVolume {
                    uuid: mount.uuid,
                    name: mount.name,
                    at: Some(mount.at),
                    readonly: mount.readonly,
                })
                .collect()
        });

        CreateInstanceRequest {
            image: config.image,
            name: config.name,
            args: config.args,
            env: config.env,
            memory_mb: config.memory_mb,
            vcpus: config.vcpus,
            autostart: config.autostart,
            features: config.features,
            service_group,
            volumes,
            wait_timeout_ms: config.wait_timeout_ms,
        }
    }
}

fn string_list() -> AttributeType {
    AttributeType::list(AttributeType::String)
}

/// Schema of the instance resource.
pub(crate) fn instance_schema() -> Schema {
    Schema::v0()
        .with_description("A Unikraft Cloud instance.")
        .with_attribute("uuid", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute(
            "state",
            Attribute::computed_string().with_description("e.g. `running`, `stopped`."),
        )
        .with_attribute("fqdn", Attribute::computed_string())
        .with_attribute("private_fqdn", Attribute::computed_string())
        .with_attribute("private_ip", Attribute::computed_string())
        .with_attribute(
            "boot_time_us",
            Attribute::computed_int64().with_description("Boot time in microseconds."),
        )
        .with_attribute("service_group_uuid", Attribute::computed_string())
        .with_attribute(
            "image",
            Attribute::required_string()
                .with_force_new()
                .with_description("Image to run, e.g. `nginx:latest`."),
        )
        .with_attribute("name", Attribute::optional_computed_string().with_force_new())
        .with_attribute(
            "args",
            Attribute::of(string_list(), AttributeFlags::optional()).with_force_new(),
        )
        .with_attribute(
            "env",
            Attribute::of(
                AttributeType::map(AttributeType::String),
                AttributeFlags::optional(),
            )
            .with_force_new(),
        )
        .with_attribute(
            "memory_mb",
            Attribute::optional_computed_int64().with_force_new(),
        )
        .with_attribute("vcpus", Attribute::optional_computed_int64().with_force_new())
        .with_attribute(
            "autostart",
            Attribute::optional_bool()
                .with_force_new()
                .with_description("Start the instance after creation. Defaults to true."),
        )
        .with_attribute(
            "features",
            Attribute::of(string_list(), AttributeFlags::optional()).with_force_new(),
        )
        .with_attribute(
            "wait_timeout_ms",
            Attribute::optional_int64()
                .with_force_new()
                .with_description("How long create waits for the instance to start."),
        )
        .with_block(
            "service_group",
            NestedBlock::single(
                Block::new()
                    .with_description(
                        "Attach to an existing service group by `uuid` or `name`, \
                         or describe a new one with `services` and `domains`.",
                    )
                    .with_attribute("uuid", Attribute::optional_string())
                    .with_attribute("name", Attribute::optional_string())
                    .with_block("services", services_block())
                    .with_block("domains", domains_block()),
            )
            .with_force_new(),
        )
        .with_block(
            "volumes",
            NestedBlock::list(
                Block::new()
                    .with_attribute("uuid", Attribute::optional_string())
                    .with_attribute("name", Attribute::optional_string())
                    .with_attribute("at", Attribute::required_string())
                    .with_attribute("readonly", Attribute::optional_bool()),
            )
            .with_force_new(),
        )
}

/// The API-owned part of an instance state.
pub(crate) fn instance_state(instance: &Instance) -> Map<String, Value> {
    let group = instance.service_group.as_ref();
    let fqdn = instance.fqdn.clone().or_else(|| {
        group
            .and_then(|g| g.domains.first())
            .and_then(|d| d.fqdn.clone())
    });
    let volumes: Vec<Value> = instance
        .volumes
        .iter()
        .map(|v| {
            json!({
                "uuid": v.uuid,
                "name": v.name,
                "at": v.at,
                "readonly": v.readonly,
            })
        })
        .collect();

    let mut state = Map::new();
    state.insert("uuid".to_string(), json!(instance.uuid));
    state.insert("name".to_string(), json!(instance.name));
    state.insert("created_at".to_string(), json!(instance.created_at));
    state.insert("state".to_string(), json!(instance.state));
    state.insert("image".to_string(), json!(instance.image));
    state.insert("memory_mb".to_string(), json!(instance.memory_mb));
    state.insert("vcpus".to_string(), json!(instance.vcpus));
    state.insert("args".to_string(), non_empty(json!(instance.args)));
    state.insert("env".to_string(), non_empty(json!(instance.env)));
    state.insert("fqdn".to_string(), json!(fqdn));
    state.insert("private_fqdn".to_string(), json!(instance.private_fqdn));
    state.insert("private_ip".to_string(), json!(instance.private_ip));
    state.insert("boot_time_us".to_string(), json!(instance.boot_time_us));
    state.insert(
        "service_group_uuid".to_string(),
        json!(group.and_then(|g| g.uuid.as_ref())),
    );
    state.insert("volumes".to_string(), non_empty(json!(volumes)));
    state
}

#[async_trait::async_trait]
impl Resource for InstanceResource {
    fn type_name(&self) -> &'static str {
        INSTANCE
    }

    fn schema(&self) -> Schema {
        instance_schema()
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<String, ProviderError> {
        let request = CreateInstanceRequest::from(decode::<InstanceConfig>(planned)?);
        debug!(image = %request.image, "creating instance");
        let instance = client
            .create_instance(&request)
            .await
            .map_err(|e| ProviderError::client("create instance", e))?;
        created_uuid(instance.uuid, "instance")
    }

    async fn get(
        &self,
        client: &Client,
        uuid: &str,
        prior: &Value,
    ) -> Result<Value, ProviderError> {
        let instance = client
            .get_instance(uuid)
            .await
            .map_err(|e| ProviderError::client("read instance", e))?;
        Ok(reconcile(&instance_schema(), instance_state(&instance), prior))
    }

    async fn delete(&self, client: &Client, uuid: &str) -> Result<(), ProviderError> {
        client
            .delete_instance(uuid)
            .await
            .map(drop)
            .map_err(|e| ProviderError::client("delete instance", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ObjectRef;
    use crate::plan::plan_resource;
    use crate::validation::validate;

    fn planned() -> Value {
        json!({
            "uuid": null,
            "fqdn": null,
            "image": "nginx:latest",
            "name": "web",
            "args": ["-g", "daemon off;"],
            "env": {"PORT": "8080"},
            "memory_mb": 256,
            "vcpus": null,
            "autostart": null,
            "features": null,
            "wait_timeout_ms": 5000,
            "service_group": {
                "uuid": null,
                "name": null,
                "services": [{"port": 443, "destination_port": 8080, "handlers": ["tls", "http"]}],
                "domains": [{"name": "web", "certificate": null}]
            },
            "volumes": [{"uuid": null, "name": "data", "at": "/data", "readonly": false}]
        })
    }

    #[test]
    fn test_config_to_request() {
        let request = CreateInstanceRequest::from(decode::<InstanceConfig>(&planned()).unwrap());

        assert_eq!(request.image, "nginx:latest");
        assert_eq!(request.memory_mb, Some(256));
        assert_eq!(request.vcpus, None);
        assert_eq!(request.env.unwrap()["PORT"], "8080");

        let group = request.service_group.unwrap();
        assert!(group.uuid.is_none());
        assert_eq!(group.services[0].port, 443);
        assert_eq!(group.domains[0].name, "web");

        let volumes = request.volumes.unwrap();
        assert_eq!(volumes[0].at.as_deref(), Some("/data"));
        assert_eq!(volumes[0].name.as_deref(), Some("data"));
    }

    #[test]
    fn test_existing_service_group_by_name() {
        let mut planned = planned();
        planned["service_group"] = json!({"name": "edge"});
        let request = CreateInstanceRequest::from(decode::<InstanceConfig>(&planned).unwrap());

        let group = request.service_group.unwrap();
        assert_eq!(group.name.as_deref(), Some("edge"));
        assert!(group.services.is_empty());
        assert_eq!(
            existing_group_ref(group.uuid.as_deref(), group.name.as_deref()),
            Some(ObjectRef::by_name("edge"))
        );
    }

    #[test]
    fn test_state_keeps_configured_values() {
        let instance: Instance = serde_json::from_value(json!({
            "uuid": "i-1",
            "name": "web",
            "state": "running",
            "image": "nginx@sha256:0123",
            "memory_mb": 256,
            "vcpus": 1,
            "args": [],
            "env": {},
            "private_ip": "10.0.0.2",
            "service_group": {"uuid": "sg-1", "domains": [{"fqdn": "web.fra0.kraft.host"}]},
            "volumes": [{"uuid": "vol-1", "at": "/data"}]
        }))
        .unwrap();

        let state = reconcile(&instance_schema(), instance_state(&instance), &planned());

        assert_eq!(state["uuid"], "i-1");
        assert_eq!(state["image"], "nginx:latest");
        assert_eq!(state["vcpus"], 1);
        assert_eq!(state["fqdn"], "web.fra0.kraft.host");
        assert_eq!(state["service_group_uuid"], "sg-1");
        assert_eq!(state["wait_timeout_ms"], 5000);
        assert_eq!(state["args"], json!(["-g", "daemon off;"]));
        assert_eq!(state["volumes"][0]["name"], "data");
    }

    #[test]
    fn test_imported_state_has_every_attribute() {
        let instance: Instance = serde_json::from_value(json!({
            "uuid": "i-1",
            "image": "nginx:latest",
            "args": [],
            "env": {}
        }))
        .unwrap();
        let state = reconcile(&instance_schema(), instance_state(&instance), &Value::Null);

        assert!(state["args"].is_null());
        assert!(state["env"].is_null());
        assert!(state["service_group"].is_null());
        let schema = instance_schema();
        for key in schema.block.attributes.keys().chain(schema.block.blocks.keys()) {
            assert!(state.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_refreshed_state_plans_no_change() {
        let instance: Instance = serde_json::from_value(json!({
            "uuid": "i-1",
            "name": "web",
            "image": "nginx@sha256:0123",
            "memory_mb": 256,
            "vcpus": 1
        }))
        .unwrap();
        let prior = reconcile(&instance_schema(), instance_state(&instance), &planned());

        let plan = plan_resource(&instance_schema(), Some(prior), planned());
        assert!(plan.is_no_op(), "unexpected changes: {:?}", plan.changes);

        let mut bigger = planned();
        bigger["memory_mb"] = json!(512);
        let prior = reconcile(&instance_schema(), instance_state(&instance), &planned());
        assert!(plan_resource(&instance_schema(), Some(prior), bigger).requires_replace);
    }

    #[test]
    fn test_schema_validation() {
        assert!(validate(&instance_schema(), &planned()).is_empty());

        let diagnostics = validate(&instance_schema(), &json!({"memory_mb": 128}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("image"));
    }
}
