//! Managed resources.
//!
//! Each resource knows its schema and how to create, fetch and delete the
//! remote entity. The lifecycle rules shared by all of them (re-read after
//! create, `null` on a vanished entity, no in-place updates) live in
//! [`UnikraftCloudProvider`](crate::UnikraftCloudProvider).
//!
//! State is reconciled from two sources: values the user configured are kept
//! from the prior state, and everything else is filled in from the API.

mod certificate;
mod instance;
mod service_group;
mod volume;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ProviderError;
use crate::platform::{Client, ObjectRef};
use crate::schema::Schema;

pub use certificate::CertificateResource;
pub use instance::InstanceResource;
pub use service_group::ServiceGroupResource;
pub use volume::VolumeResource;

pub(crate) use certificate::certificate_state;
pub(crate) use instance::instance_state;
pub(crate) use service_group::service_group_state;
pub(crate) use volume::volume_state;

/// Type name of the instance resource and data source.
pub const INSTANCE: &str = "unikraft-cloud_instance";
/// Type name of the service group resource and data source.
pub const SERVICE_GROUP: &str = "unikraft-cloud_service_group";
/// Type name of the certificate resource and data source.
pub const CERTIFICATE: &str = "unikraft-cloud_certificate";
/// Type name of the volume resource and data source.
pub const VOLUME: &str = "unikraft-cloud_volume";

/// A resource type backed by one API collection.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `unikraft-cloud_instance`.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource state.
    fn schema(&self) -> Schema;

    /// Create the remote entity from a planned state and return its UUID.
    async fn create(&self, client: &Client, planned: &Value) -> Result<String, ProviderError>;

    /// Fetch the entity and reconcile it with `prior` into a full state.
    async fn get(&self, client: &Client, uuid: &str, prior: &Value)
        -> Result<Value, ProviderError>;

    /// Delete the remote entity.
    async fn delete(&self, client: &Client, uuid: &str) -> Result<(), ProviderError>;
}

/// Every resource this provider serves.
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(InstanceResource),
        Arc::new(ServiceGroupResource),
        Arc::new(CertificateResource),
        Arc::new(VolumeResource),
    ]
}

/// The `uuid` recorded in a state.
pub(crate) fn state_uuid(state: &Value) -> Result<&str, ProviderError> {
    state
        .get("uuid")
        .and_then(Value::as_str)
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest("state has no `uuid`".to_string()))
}

/// Decode a planned state into a typed config.
pub(crate) fn decode<T: DeserializeOwned>(state: &Value) -> Result<T, ProviderError> {
    Ok(T::deserialize(state)?)
}

/// The UUID of a freshly created entity.
pub(crate) fn created_uuid(uuid: Option<String>, kind: &str) -> Result<String, ProviderError> {
    uuid.filter(|uuid| !uuid.is_empty()).ok_or_else(|| {
        ProviderError::Api(format!("Unable to create {}: no uuid returned", kind))
    })
}

/// Reference an entity by UUID when the value parses as one, by name
/// otherwise. UUIDs are sent in their hyphenated lowercase form.
pub(crate) fn object_ref(value: &str) -> ObjectRef {
    match Uuid::parse_str(value) {
        Ok(uuid) => ObjectRef::by_uuid(uuid.hyphenated().to_string()),
        Err(_) => ObjectRef::by_name(value),
    }
}

/// Whether a state value counts as unset.
pub(crate) fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Collapse empty lists and maps to `null`.
pub(crate) fn non_empty(value: Value) -> Value {
    if is_unset(&value) {
        Value::Null
    } else {
        value
    }
}

/// Merge API-reported values with the configured values of `prior`.
///
/// Configured attributes and blocks set in `prior` win; computed attributes
/// always come from the API. Every schema key is present in the result.
pub(crate) fn reconcile(schema: &Schema, mut state: Map<String, Value>, prior: &Value) -> Value {
    let configured = |key: &str| prior.get(key).filter(|v| !is_unset(v)).cloned();

    for (name, attr) in &schema.block.attributes {
        if !attr.flags.is_computed_only() {
            if let Some(value) = configured(name) {
                state.insert(name.clone(), value);
            }
        }
        state.entry(name.clone()).or_insert(Value::Null);
    }
    for name in schema.block.blocks.keys() {
        if let Some(value) = configured(name) {
            state.insert(name.clone(), value);
        }
        state.entry(name.clone()).or_insert(Value::Null);
    }
    Value::Object(state)
}
