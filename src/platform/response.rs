//! The JSON envelope shared by every Unikraft Cloud API response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ClientError;
use crate::sse::EventReceiver;

/// A decoded response body.
#[derive(Debug)]
pub enum ResponseBody<T> {
    /// A JSON envelope whose `data` was decoded into `T`.
    Json(T),
    /// A `text/event-stream` body, read by a background listener.
    Events(EventReceiver),
}

/// Top-level response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// `success`, `partial_success` or `error`.
    pub status: Option<String>,
    /// Human-readable summary.
    pub message: Option<String>,
    /// Request-level errors.
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
    /// Payload, keyed by collection name.
    pub data: Option<T>,
}

/// One request-level error.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorDetail {
    /// HTTP-like status code.
    pub status: Option<u16>,
    /// Error message.
    pub message: Option<String>,
}

impl ApiResponse<Value> {
    /// Check the envelope status and hand out the payload.
    ///
    /// A failed envelope that still carries failed items reports the first
    /// item's message and error code under the response's HTTP status.
    pub(crate) fn into_data(self, http_status: u16) -> Result<Value, ClientError> {
        let failed =
            self.status.as_deref() == Some("error") || !(200..300).contains(&http_status);
        if !failed {
            return Ok(self.data.unwrap_or(Value::Null));
        }

        let item = self.first_failed_item();
        let message = match (self.errors.is_empty(), &item) {
            (true, Some(item)) => item
                .message
                .clone()
                .unwrap_or_else(|| self.error_message()),
            _ => self.error_message(),
        };
        Err(ClientError::Api {
            status: http_status,
            message,
            code: item.and_then(|item| item.error),
        })
    }

    fn first_failed_item(&self) -> Option<ItemStatus> {
        self.data
            .as_ref()?
            .as_object()?
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(|item| ItemStatus::deserialize(item).ok())
            .find(|item| item.status.as_deref() == Some("error"))
    }

    fn error_message(&self) -> String {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.message.as_deref())
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
        self.message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Outcome reported for a single item inside `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemStatus {
    /// `success` or `error`.
    pub status: Option<String>,
    /// Error message for failed items.
    pub message: Option<String>,
    /// Error code for failed items.
    pub error: Option<i64>,
}

impl ItemStatus {
    /// Fail when the API flagged this item as an error.
    pub fn check(&self, http_status: u16) -> Result<(), ClientError> {
        if self.status.as_deref() == Some("error") {
            return Err(ClientError::Api {
                status: http_status,
                message: self
                    .message
                    .clone()
                    .unwrap_or_else(|| "item failed".to_string()),
                code: self.error,
            });
        }
        Ok(())
    }
}

/// An item that carries its own [`ItemStatus`].
pub trait ApiItem {
    /// The per-item outcome.
    fn item_status(&self) -> &ItemStatus;
}

/// Reference to an entity by UUID or name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectRef {
    /// Entity UUID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Entity name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ObjectRef {
    /// Reference by UUID.
    pub fn by_uuid(uuid: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            name: None,
        }
    }

    /// Reference by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            uuid: None,
            name: Some(name.into()),
        }
    }
}

/// Pull `data.<collection>` out of a payload and check each item against the
/// response's HTTP status.
pub(crate) fn take_items<T>(
    mut data: Value,
    collection: &str,
    http_status: u16,
) -> Result<Vec<T>, ClientError>
where
    T: DeserializeOwned + ApiItem,
{
    let raw = match data.get_mut(collection) {
        Some(items) => items.take(),
        None => return Ok(Vec::new()),
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }

    let items: Vec<T> = serde_json::from_value(raw)?;
    for item in &items {
        item.item_status().check(http_status)?;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Thing {
        #[serde(flatten)]
        outcome: ItemStatus,
        uuid: Option<String>,
    }

    impl ApiItem for Thing {
        fn item_status(&self) -> &ItemStatus {
            &self.outcome
        }
    }

    fn envelope(value: Value) -> ApiResponse<Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let data = envelope(json!({
            "status": "success",
            "data": {"things": [{"status": "success", "uuid": "a"}]}
        }))
        .into_data(200)
        .unwrap();

        let items: Vec<Thing> = take_items(data, "things", 200).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uuid.as_deref(), Some("a"));
    }

    #[test]
    fn test_error_envelope_collects_messages() {
        let err = envelope(json!({
            "status": "error",
            "errors": [{"status": 404, "message": "no such instance"}, {"message": "try again"}]
        }))
        .into_data(404)
        .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("no such instance; try again"));
    }

    #[test]
    fn test_non_success_status_without_error_flag() {
        let err = envelope(json!({"message": "unauthorized"}))
            .into_data(401)
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("unauthorized"));
    }

    #[test]
    fn test_item_error() {
        let data = json!({"things": [
            {"status": "success", "uuid": "a"},
            {"status": "error", "message": "quota exceeded", "error": 3}
        ]});
        let err = take_items::<Thing>(data, "things", 207).unwrap_err();
        match err {
            ClientError::Api {
                status,
                message,
                code,
            } => {
                assert_eq!(status, 207);
                assert_eq!(message, "quota exceeded");
                assert_eq!(code, Some(3));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_envelope_reports_item_error() {
        let err = envelope(json!({
            "status": "error",
            "data": {"volumes": [
                {"status": "error", "uuid": "vol-1", "message": "volume not found", "error": 8}
            ]}
        }))
        .into_data(404)
        .unwrap_err();

        assert!(err.is_not_found());
        match err {
            ClientError::Api { message, code, .. } => {
                assert_eq!(message, "volume not found");
                assert_eq!(code, Some(8));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_envelope_errors_win_over_item_message() {
        let err = envelope(json!({
            "status": "error",
            "errors": [{"status": 404, "message": "no such volume"}],
            "data": {"volumes": [{"status": "error", "message": "lookup failed", "error": 8}]}
        }))
        .into_data(404)
        .unwrap_err();
        assert!(err.to_string().contains("no such volume"));
        assert!(matches!(err, ClientError::Api { code: Some(8), .. }));
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let items: Vec<Thing> = take_items(json!({}), "things", 200).unwrap();
        assert!(items.is_empty());

        let items: Vec<Thing> = take_items(Value::Null, "things", 200).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_object_ref_serialization() {
        assert_eq!(
            serde_json::to_value(ObjectRef::by_name("web")).unwrap(),
            json!({"name": "web"})
        );
        assert_eq!(
            serde_json::to_value(ObjectRef::by_uuid("u-1")).unwrap(),
            json!({"uuid": "u-1"})
        );
    }
}
