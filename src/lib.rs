//! Unikraft Cloud provider
//!
//! This crate manages Unikraft Cloud instances, service groups, certificates
//! and volumes through the Unikraft Cloud REST API, and exposes them as
//! infrastructure resources and data sources.
//!
//! # Overview
//!
//! - **[`platform`]**: the API client. It resolves metro names to base URLs,
//!   authenticates with a bearer token, and decodes either a JSON envelope or
//!   a `text/event-stream` body depending on the response content type.
//! - **[`sse`]**: the Server-Sent Events reader and the background listener
//!   that forwards events on a channel.
//! - **[`ProviderService`]**: the provider lifecycle trait (schema,
//!   configure, plan, CRUD, import, data source reads).
//! - **[`UnikraftCloudProvider`]**: the implementation, dispatching to
//!   [`resources`] and [`data_sources`].
//! - **Logging**: integration with `tracing` for structured logging.
//!
//! # Quick Start
//!
//! ```ignore
//! use unikraft_cloud_provider::{ProviderService, UnikraftCloudProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     unikraft_cloud_provider::init_logging();
//!
//!     let provider = UnikraftCloudProvider::new();
//!     let diagnostics = provider.configure(json!({"metro": "fra0"})).await?;
//!     assert!(diagnostics.is_empty(), "set UKC_TOKEN");
//!
//!     let volume = provider
//!         .create("unikraft-cloud_volume", json!({"name": "data", "size_mb": 64}))
//!         .await?;
//!     println!("created volume {}", volume["uuid"]);
//!     Ok(())
//! }
//! ```
//!
//! # Lifecycle
//!
//! Every Unikraft Cloud entity is immutable once created. Any change to a
//! configured attribute plans a replacement and `update` always fails with
//! an "Update Not Supported" diagnostic. A read of an entity the API no
//! longer knows returns `null`, and deleting an already deleted entity
//! succeeds.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod platform;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod sse;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::{ConfigureTarget, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::UnikraftCloudProvider;
pub use schema::{Attribute, Diagnostic, ProviderSchema, Schema};
pub use service::ProviderService;
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
