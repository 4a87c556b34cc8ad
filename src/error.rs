//! Error types for the Unikraft Cloud provider.
//!
//! Every [`ProviderError`] renders as a [`Diagnostic`] whose summary follows a
//! fixed taxonomy:
//!
//! | Summary                                  | Cause                                   |
//! |------------------------------------------|-----------------------------------------|
//! | `Client Error`                           | transport or API failure                |
//! | `API Error`                              | empty or unexpected response shape      |
//! | `Unexpected Resource Configure Type`     | resource used before `configure`        |
//! | `Unexpected Data Source Configure Type`  | data source used before `configure`     |
//! | `Update Not Supported`                   | any in-place update                     |

use std::fmt;

use thiserror::Error;

use crate::platform::ClientError;
use crate::schema::Diagnostic;

/// What kind of entity hit an unconfigured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureTarget {
    /// A managed resource.
    Resource,
    /// A read-only data source.
    DataSource,
}

impl fmt::Display for ConfigureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource => f.write_str("Resource"),
            Self::DataSource => f.write_str("Data Source"),
        }
    }
}

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The API call failed.
    #[error("Client Error: Unable to {action}, got error: {source}")]
    Client {
        /// What the provider was trying to do, e.g. `create instance`.
        action: String,
        /// The underlying client failure.
        #[source]
        source: ClientError,
    },

    /// The API answered with an empty or unexpected response.
    #[error("API Error: {0}")]
    Api(String),

    /// An operation ran before the provider was configured with a client.
    #[error("Unexpected {target} Configure Type: {detail}")]
    UnexpectedConfigureType {
        /// Which kind of entity was invoked.
        target: ConfigureTarget,
        /// Explanation for the user.
        detail: String,
    },

    /// Resources are replaced rather than updated in place.
    #[error("Update Not Supported: {0}")]
    UpdateNotSupported(String),
}

impl ProviderError {
    /// Wrap a client failure that happened while performing `action`.
    ///
    /// Response-shape failures (empty data, undecodable body) become
    /// [`ProviderError::Api`]; everything else is [`ProviderError::Client`].
    pub fn client(action: impl Into<String>, source: ClientError) -> Self {
        let action = action.into();
        if source.is_response_shape() {
            return Self::Api(format!("Unable to {}: {}", action, source));
        }
        Self::Client { action, source }
    }

    /// The error reported when a resource or data source has no client.
    pub fn not_configured(target: ConfigureTarget) -> Self {
        Self::UnexpectedConfigureType {
            target,
            detail: "Expected a configured Unikraft Cloud client, got none. \
                     Please report this issue to the provider developers."
                .to_string(),
        }
    }

    /// The fixed error returned for every update.
    pub fn update_not_supported(resource_type: &str) -> Self {
        Self::UpdateNotSupported(format!(
            "{} does not support in-place updates; changes require replacement",
            resource_type
        ))
    }

    /// Whether the API reported that the target entity does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Client { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Diagnostic summary for this error.
    pub fn summary(&self) -> String {
        match self {
            Self::Client { .. } => "Client Error".to_string(),
            Self::Api(_) => "API Error".to_string(),
            Self::UnexpectedConfigureType { target, .. } => {
                format!("Unexpected {} Configure Type", target)
            },
            Self::UpdateNotSupported(_) => "Update Not Supported".to_string(),
            other => other.to_string(),
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::InvalidRequest(msg)
            | Self::Api(msg)
            | Self::UpdateNotSupported(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Client { action, source } => {
                format!("Unable to {}, got error: {}", action, source)
            },
            Self::UnexpectedConfigureType { detail, .. } => detail.clone(),
        }
    }

    /// Render the error as an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let summary = self.summary();
        let message = self.message();
        if summary == self.to_string() {
            Diagnostic::error(summary)
        } else {
            Diagnostic::error(summary).with_detail(message)
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        err.to_diagnostic()
    }
}
