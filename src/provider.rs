//! The Unikraft Cloud provider.
//!
//! [`UnikraftCloudProvider`] dispatches every [`ProviderService`] operation
//! to the resource or data source registered under the requested type name.
//! The API client is created by `configure`; any resource or data source
//! operation before that fails with an "Unexpected ... Configure Type" error.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{provider_config_schema, ProviderConfig};
use crate::data_sources::{self, DataSource};
use crate::error::{ConfigureTarget, ProviderError};
use crate::plan::plan_resource;
use crate::platform::Client;
use crate::resources::{self, state_uuid, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};

type EnvLookup = fn(&str) -> Option<String>;

/// Minimal state for a freshly created entity: its UUID plus the planned
/// configuration, with computed values left null.
fn created_state(resource: &dyn Resource, uuid: &str, planned: &Value) -> Value {
    let mut state = Map::new();
    state.insert("uuid".to_string(), Value::String(uuid.to_string()));
    resources::reconcile(&resource.schema(), state, planned)
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Provider for Unikraft Cloud instances, service groups, certificates and
/// volumes.
pub struct UnikraftCloudProvider {
    client: RwLock<Option<Arc<Client>>>,
    resources: HashMap<&'static str, Arc<dyn Resource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
    env: EnvLookup,
}

impl std::fmt::Debug for UnikraftCloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnikraftCloudProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for UnikraftCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UnikraftCloudProvider {
    /// Create an unconfigured provider that reads fallbacks from the process
    /// environment.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: resources::all()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
            env: process_env,
        }
    }

    /// Start out configured with `client`.
    pub fn with_client(self, client: Client) -> Self {
        Self {
            client: RwLock::new(Some(Arc::new(client))),
            ..self
        }
    }

    /// Replace the environment lookup used for configuration fallbacks.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Whether `configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self, target: ConfigureTarget) -> Result<Arc<Client>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::not_configured(target))
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for UnikraftCloudProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(provider_config_schema());
        let schema = self
            .resources
            .values()
            .fold(schema, |s, r| s.with_resource(r.type_name(), r.schema()));
        self.data_sources
            .values()
            .fold(schema, |s, d| s.with_data_source(d.type_name(), d.schema()))
    }

    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.resources.keys().map(|k| k.to_string()).collect();
        let mut data_sources: Vec<String> =
            self.data_sources.keys().map(|k| k.to_string()).collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("configuring provider");
        let config = ProviderConfig::from_value(&config)?.with_env(self.env);

        let client_config = match config.to_client_config() {
            Ok(client_config) => client_config,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "provider configuration incomplete");
                return Ok(diagnostics);
            },
        };

        let client = match Client::new(client_config) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "unable to create API client");
                return Ok(vec![Diagnostic::error(
                    "Unable to Create Unikraft Cloud API Client",
                )
                .with_detail(format!(
                    "An unexpected error occurred when creating the Unikraft Cloud API client: {}",
                    e
                ))]);
            },
        };

        info!(base_url = %client.base_url(), "provider configured");
        *self.client.write().await = Some(Arc::new(client));
        Ok(vec![])
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        info!("provider stopped");
        Ok(())
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let plan = plan_resource(&resource.schema(), prior_state, proposed_state);
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "planned"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client(ConfigureTarget::Resource).await?;

        let uuid = resource.create(&client, &planned_state).await.map_err(|e| {
            error!(error = %e, "create failed");
            e
        })?;
        info!(uuid = %uuid, "created");

        // The entity exists from here on. If it cannot be read back, record
        // the UUID with the planned values so a later refresh can find it.
        match resource.get(&client, &uuid, &planned_state).await {
            Ok(state) if !state.is_null() => Ok(state),
            Ok(_) => {
                warn!(uuid = %uuid, "created entity not found on read back");
                Ok(created_state(resource.as_ref(), &uuid, &planned_state))
            },
            Err(e) => {
                warn!(uuid = %uuid, error = %e, "read after create failed");
                Ok(created_state(resource.as_ref(), &uuid, &planned_state))
            },
        }
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        if current_state.is_null() {
            return Ok(Value::Null);
        }
        let client = self.client(ConfigureTarget::Resource).await?;
        let uuid = state_uuid(&current_state)?;

        match resource.get(&client, uuid, &current_state).await {
            Ok(state) => Ok(state),
            Err(e) if e.is_not_found() => {
                warn!(uuid = %uuid, "resource no longer exists, removing from state");
                Ok(Value::Null)
            },
            Err(e) => {
                error!(uuid = %uuid, error = %e, "read failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self, _prior_state, _planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        _prior_state: Value,
        _planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?;
        Err(ProviderError::update_not_supported(resource_type))
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client(ConfigureTarget::Resource).await?;
        let uuid = state_uuid(&current_state)?;

        match resource.delete(&client, uuid).await {
            Ok(()) => {
                info!(uuid = %uuid, "deleted");
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                debug!(uuid = %uuid, "already deleted");
                Ok(())
            },
            Err(e) => {
                error!(uuid = %uuid, error = %e, "delete failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client(ConfigureTarget::Resource).await?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "import ID must be the entity UUID".to_string(),
            ));
        }

        let state = resource
            .get(&client, id, &Value::Null)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ProviderError::NotFound(format!("{} {}", resource_type, id))
                } else {
                    e
                }
            })?;
        info!(uuid = %id, "imported");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client(ConfigureTarget::DataSource).await?;
        data_source.read(&client, &config).await.map_err(|e| {
            error!(error = %e, "data source read failed");
            e
        })
    }
}
