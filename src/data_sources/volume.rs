//! `unikraft-cloud_volume` data source.

use serde_json::Value;

use super::{lookup_schema, project, DataSource, Lookup};
use crate::error::ProviderError;
use crate::platform::Client;
use crate::resources::{volume_state, Resource, VolumeResource, VOLUME};
use crate::schema::Schema;

/// Looks up a volume by UUID or name.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeDataSource;

#[async_trait::async_trait]
impl DataSource for VolumeDataSource {
    fn type_name(&self) -> &'static str {
        VOLUME
    }

    fn schema(&self) -> Schema {
        lookup_schema(VolumeResource.schema(), "Look up a Unikraft Cloud volume.")
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let volume = match Lookup::from_config(config)? {
            Lookup::Uuid(uuid) => client.get_volume(&uuid).await,
            Lookup::Name(name) => client.get_volume_by_name(&name).await,
        }
        .map_err(|e| ProviderError::client("read volume", e))?;
        Ok(project(&self.schema(), volume_state(&volume)))
    }
}
