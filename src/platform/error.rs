//! Errors returned by the Unikraft Cloud API client.

use thiserror::Error;

use crate::sse::SseError;

/// Errors that can occur while talking to the Unikraft Cloud API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client could not be built from its configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered with a non-success status and a body that is not
    /// an API envelope.
    #[error("Unexpected HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The API reported a failure, either for the whole request or for one
    /// of the returned items.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Error messages reported by the API.
        message: String,
        /// Item-level error code, when the failure belongs to a single item.
        code: Option<i64>,
    },

    /// The API answered successfully but returned no usable data.
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// The response body used a different encoding than the caller asked for.
    #[error("Expected {expected} response, got content type '{actual}'")]
    UnexpectedContentType {
        /// What the caller asked for.
        expected: &'static str,
        /// The `Content-Type` the server sent.
        actual: String,
    },

    /// Reading an event stream failed.
    #[error(transparent)]
    Stream(#[from] SseError),
}

impl ClientError {
    /// HTTP status code associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the API reported that the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the failure describes an unexpected or empty response shape
    /// rather than a transport or API failure.
    pub fn is_response_shape(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse(_) | Self::Decode(_) | Self::UnexpectedContentType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 404,
            message: "instance not found".to_string(),
            code: None,
        };
        assert_eq!(format!("{}", err), "API error (HTTP 404): instance not found");

        let err = ClientError::UnexpectedContentType {
            expected: "JSON",
            actual: "text/event-stream".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Expected JSON response, got content type 'text/event-stream'"
        );
    }

    #[test]
    fn test_not_found() {
        let err = ClientError::Api {
            status: 404,
            message: "missing".to_string(),
            code: Some(8),
        };
        assert!(err.is_not_found());

        let err = ClientError::Status {
            status: 500,
            body: "oops".to_string(),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(500));

        assert_eq!(ClientError::EmptyResponse("x".to_string()).status(), None);
    }

    #[test]
    fn test_response_shape() {
        assert!(ClientError::EmptyResponse("no instances".to_string()).is_response_shape());
        assert!(!ClientError::InvalidConfig("no token".to_string()).is_response_shape());
    }
}
