//! `unikraft-cloud_service_group` data source.

use serde_json::Value;

use super::{lookup_schema, project, DataSource, Lookup};
use crate::error::ProviderError;
use crate::platform::Client;
use crate::resources::{service_group_state, Resource, ServiceGroupResource, SERVICE_GROUP};
use crate::schema::Schema;

/// Looks up a service group by UUID or name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceGroupDataSource;

#[async_trait::async_trait]
impl DataSource for ServiceGroupDataSource {
    fn type_name(&self) -> &'static str {
        SERVICE_GROUP
    }

    fn schema(&self) -> Schema {
        lookup_schema(
            ServiceGroupResource.schema(),
            "Look up a Unikraft Cloud service group.",
        )
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let group = match Lookup::from_config(config)? {
            Lookup::Uuid(uuid) => client.get_service_group(&uuid).await,
            Lookup::Name(name) => client.get_service_group_by_name(&name).await,
        }
        .map_err(|e| ProviderError::client("read service group", e))?;
        Ok(project(&self.schema(), service_group_state(&group)))
    }
}
