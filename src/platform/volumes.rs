//! Volume endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::response::{ApiItem, ItemStatus, ObjectRef};
use super::{Client, ClientError, NO_BODY};

const COLLECTION: &str = "volumes";

/// Body of `POST /volumes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateVolumeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub size_mb: i64,
    /// Existing volume to clone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<ObjectRef>,
}

/// A volume as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Volume {
    #[serde(flatten)]
    pub outcome: ItemStatus,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub state: Option<String>,
    pub size_mb: Option<i64>,
    pub persistent: Option<bool>,
    #[serde(default)]
    pub attached_to: Vec<ObjectRef>,
}

impl ApiItem for Volume {
    fn item_status(&self) -> &ItemStatus {
        &self.outcome
    }
}

impl Client {
    /// Create a volume.
    pub async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, ClientError> {
        self.item(Method::POST, &["volumes"], Some(request), COLLECTION)
            .await
    }

    /// Get a volume by UUID.
    pub async fn get_volume(&self, uuid: &str) -> Result<Volume, ClientError> {
        self.item(Method::GET, &["volumes", uuid], NO_BODY, COLLECTION).await
    }

    /// Get a volume by name.
    pub async fn get_volume_by_name(&self, name: &str) -> Result<Volume, ClientError> {
        self.item(
            Method::GET,
            &["volumes"],
            Some(&[ObjectRef::by_name(name)]),
            COLLECTION,
        )
        .await
    }

    /// List all volumes. Only `uuid` and `name` are populated.
    pub async fn list_volumes(&self) -> Result<Vec<Volume>, ClientError> {
        self.items(Method::GET, &["volumes"], NO_BODY, COLLECTION)
            .await
    }

    /// Delete a volume by UUID.
    pub async fn delete_volume(&self, uuid: &str) -> Result<Volume, ClientError> {
        self.item(Method::DELETE, &["volumes", uuid], NO_BODY, COLLECTION).await
    }
}
