//! `unikraft-cloud_volume`: persistent storage mounted into instances.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{created_uuid, decode, non_empty, object_ref, reconcile, Resource, VOLUME};
use crate::error::ProviderError;
use crate::platform::{Client, CreateVolumeRequest, Volume};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// The volume resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeResource;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VolumeConfig {
    name: Option<String>,
    size_mb: i64,
    template: Option<String>,
}

impl From<VolumeConfig> for CreateVolumeRequest {
    fn from(config: VolumeConfig) -> Self {
        CreateVolumeRequest {
            name: config.name,
            size_mb: config.size_mb,
            template: config.template.as_deref().map(object_ref),
        }
    }
}

/// Schema of the volume resource.
pub(crate) fn volume_schema() -> Schema {
    Schema::v0()
        .with_description("A Unikraft Cloud persistent volume.")
        .with_attribute("uuid", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute("state", Attribute::computed_string())
        .with_attribute("persistent", Attribute::computed_bool())
        .with_attribute(
            "attached_to",
            Attribute::of(
                AttributeType::list(AttributeType::String),
                AttributeFlags::computed(),
            )
            .with_description("UUIDs of the instances the volume is attached to."),
        )
        .with_attribute("name", Attribute::optional_computed_string().with_force_new())
        .with_attribute(
            "size_mb",
            Attribute::required_int64()
                .with_force_new()
                .with_description("Size in MiB."),
        )
        .with_attribute(
            "template",
            Attribute::optional_string()
                .with_force_new()
                .with_description("UUID or name of a volume to clone."),
        )
}

/// The API-owned part of a volume state.
pub(crate) fn volume_state(volume: &Volume) -> Map<String, Value> {
    let attached_to: Vec<&str> = volume
        .attached_to
        .iter()
        .filter_map(|i| i.uuid.as_deref())
        .collect();

    let mut state = Map::new();
    state.insert("uuid".to_string(), json!(volume.uuid));
    state.insert("name".to_string(), json!(volume.name));
    state.insert("created_at".to_string(), json!(volume.created_at));
    state.insert("state".to_string(), json!(volume.state));
    state.insert("size_mb".to_string(), json!(volume.size_mb));
    state.insert("persistent".to_string(), json!(volume.persistent));
    state.insert("attached_to".to_string(), non_empty(json!(attached_to)));
    state
}

#[async_trait::async_trait]
impl Resource for VolumeResource {
    fn type_name(&self) -> &'static str {
        VOLUME
    }

    fn schema(&self) -> Schema {
        volume_schema()
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<String, ProviderError> {
        let request = CreateVolumeRequest::from(decode::<VolumeConfig>(planned)?);
        debug!(size_mb = request.size_mb, "creating volume");
        let volume = client
            .create_volume(&request)
            .await
            .map_err(|e| ProviderError::client("create volume", e))?;
        created_uuid(volume.uuid, "volume")
    }

    async fn get(
        &self,
        client: &Client,
        uuid: &str,
        prior: &Value,
    ) -> Result<Value, ProviderError> {
        let volume = client
            .get_volume(uuid)
            .await
            .map_err(|e| ProviderError::client("read volume", e))?;
        Ok(reconcile(&volume_schema(), volume_state(&volume), prior))
    }

    async fn delete(&self, client: &Client, uuid: &str) -> Result<(), ProviderError> {
        client
            .delete_volume(uuid)
            .await
            .map(drop)
            .map_err(|e| ProviderError::client("delete volume", e))
    }
}
