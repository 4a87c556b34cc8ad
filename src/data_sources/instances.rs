//! `unikraft-cloud_instances`: every instance in the metro, optionally
//! filtered by state.

use serde_json::{json, Value};
use tracing::debug;

use super::{DataSource, INSTANCES};
use crate::error::ProviderError;
use crate::platform::{Client, Instance, ObjectRef};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// Lists instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstancesDataSource;

fn summary(instance: &Instance) -> Value {
    json!({
        "uuid": instance.uuid,
        "name": instance.name,
        "state": instance.state,
        "image": instance.image,
        "fqdn": instance.fqdn,
        "private_ip": instance.private_ip,
    })
}

fn summary_type() -> AttributeType {
    AttributeType::object(
        ["uuid", "name", "state", "image", "fqdn", "private_ip"]
            .into_iter()
            .map(|key| (key, AttributeType::String)),
    )
}

#[async_trait::async_trait]
impl DataSource for InstancesDataSource {
    fn type_name(&self) -> &'static str {
        INSTANCES
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List the Unikraft Cloud instances of the configured metro.")
            .with_attribute(
                "state",
                Attribute::optional_string()
                    .with_description("Only include instances in this state, e.g. `running`."),
            )
            .with_attribute(
                "uuids",
                Attribute::of(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::computed(),
                ),
            )
            .with_attribute(
                "instances",
                Attribute::of(AttributeType::list(summary_type()), AttributeFlags::computed()),
            )
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let state_filter = config
            .get("state")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        // The listing only carries uuid and name; details need a second lookup.
        let listed = client
            .list_instances()
            .await
            .map_err(|e| ProviderError::client("list instances", e))?;
        let refs: Vec<ObjectRef> = listed
            .iter()
            .filter_map(|i| i.uuid.as_deref().map(ObjectRef::by_uuid))
            .collect();
        let detailed = if refs.is_empty() {
            Vec::new()
        } else {
            client
                .get_instances(&refs)
                .await
                .map_err(|e| ProviderError::client("read instances", e))?
        };

        let selected: Vec<&Instance> = detailed
            .iter()
            .filter(|i| state_filter.map_or(true, |s| i.state.as_deref() == Some(s)))
            .collect();
        debug!(
            listed = listed.len(),
            selected = selected.len(),
            "listed instances"
        );

        Ok(json!({
            "state": state_filter,
            "uuids": selected.iter().map(|i| i.uuid.clone()).collect::<Vec<_>>(),
            "instances": selected.iter().map(|i| summary(i)).collect::<Vec<_>>(),
        }))
    }
}
