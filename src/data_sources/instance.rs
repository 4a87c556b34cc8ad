//! `unikraft-cloud_instance` data source.

use serde_json::Value;

use super::{lookup_schema, project, DataSource, Lookup};
use crate::error::ProviderError;
use crate::platform::Client;
use crate::resources::{instance_state, InstanceResource, Resource, INSTANCE};
use crate::schema::Schema;

/// Looks up an instance by UUID or name.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceDataSource;

#[async_trait::async_trait]
impl DataSource for InstanceDataSource {
    fn type_name(&self) -> &'static str {
        INSTANCE
    }

    fn schema(&self) -> Schema {
        lookup_schema(InstanceResource.schema(), "Look up a Unikraft Cloud instance.")
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let instance = match Lookup::from_config(config)? {
            Lookup::Uuid(uuid) => client.get_instance(&uuid).await,
            Lookup::Name(name) => client.get_instance_by_name(&name).await,
        }
        .map_err(|e| ProviderError::client("read instance", e))?;
        Ok(project(&self.schema(), instance_state(&instance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_read_only() {
        let schema = InstanceDataSource.schema();
        assert!(schema.attribute("image").unwrap().flags.is_computed_only());
        assert!(schema.attribute("name").unwrap().flags.optional);
        assert!(schema.attribute("wait_timeout_ms").unwrap().flags.is_computed_only());
        assert!(schema.block.blocks.is_empty());
    }
}
