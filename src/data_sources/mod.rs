//! Read-only data sources.
//!
//! The single-entity data sources look an entity up by `uuid` or `name` and
//! expose the same attributes as the matching resource, all computed.
//! Secrets and configuration-only blocks are left out.

mod certificate;
mod instance;
mod instances;
mod service_group;
mod volume;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::platform::Client;
use crate::schema::{Attribute, AttributeFlags, Schema};

pub use certificate::CertificateDataSource;
pub use instance::InstanceDataSource;
pub use instances::InstancesDataSource;
pub use service_group::ServiceGroupDataSource;
pub use volume::VolumeDataSource;

/// Type name of the instance listing data source.
pub const INSTANCES: &str = "unikraft-cloud_instances";

/// A read-only data source.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `unikraft-cloud_volume`.
    fn type_name(&self) -> &'static str;

    /// Schema of the data source state.
    fn schema(&self) -> Schema;

    /// Read the data source for the given configuration.
    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError>;
}

/// Every data source this provider serves.
pub fn all() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(InstanceDataSource),
        Arc::new(InstancesDataSource),
        Arc::new(ServiceGroupDataSource),
        Arc::new(CertificateDataSource),
        Arc::new(VolumeDataSource),
    ]
}

/// How a single-entity data source selects its entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    Uuid(String),
    Name(String),
}

impl Lookup {
    /// Pick `uuid` when set, `name` otherwise.
    pub(crate) fn from_config(config: &Value) -> Result<Self, ProviderError> {
        let field = |key: &str| {
            config
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(uuid) = field("uuid") {
            return Ok(Self::Uuid(uuid));
        }
        if let Some(name) = field("name") {
            return Ok(Self::Name(name));
        }
        Err(ProviderError::Validation(
            "one of `uuid` or `name` must be set".to_string(),
        ))
    }
}

/// Derive a lookup schema from a resource schema.
///
/// `uuid` and `name` become optional inputs, every other attribute becomes
/// computed, and sensitive attributes and nested blocks are dropped.
pub(crate) fn lookup_schema(resource: Schema, description: &str) -> Schema {
    let mut schema = Schema::v0().with_description(description);
    for (name, attr) in resource.block.attributes {
        if attr.flags.sensitive {
            continue;
        }
        let flags = match name.as_str() {
            "uuid" | "name" => AttributeFlags::optional_computed(),
            _ => AttributeFlags::computed(),
        };
        let mut attr = Attribute::of(attr.attr_type, flags);
        if name == "uuid" || name == "name" {
            attr = attr.with_description(format!("Select the entity by {}.", name));
        }
        schema = schema.with_attribute(name, attr);
    }
    schema
}

/// Keep exactly the schema's attributes, `null` where the API had no value.
pub(crate) fn project(schema: &Schema, mut state: Map<String, Value>) -> Value {
    let projected: Map<String, Value> = schema
        .block
        .attributes
        .keys()
        .map(|key| (key.clone(), state.remove(key).unwrap_or(Value::Null)))
        .collect();
    Value::Object(projected)
}
