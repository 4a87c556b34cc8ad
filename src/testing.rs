//! Test harness for driving a [`ProviderService`] directly.
//!
//! Pair [`ProviderTester`] with a provider whose client points at a local mock
//! API to exercise full plan, apply and refresh cycles in tests.
//!
//! # Example
//!
//! ```ignore
//! use unikraft_cloud_provider::testing::{assert_plan_replaces, ProviderTester};
//! use unikraft_cloud_provider::UnikraftCloudProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn volume_resize_replaces() {
//!     let tester = ProviderTester::new(UnikraftCloudProvider::new());
//!     tester.configure(json!({"metro": mock_url, "token": "test"})).await.unwrap();
//!
//!     let state = tester.lifecycle_create("unikraft-cloud_volume", json!({"size_mb": 16})).await.unwrap();
//!     let mut resized = state.clone();
//!     resized["size_mb"] = json!(32);
//!     assert_plan_replaces(&tester.plan_update("unikraft-cloud_volume", state, resized).await.unwrap());
//! }
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Wraps a provider with shorthand calls and lifecycle helpers.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Schema of one resource type.
    pub fn resource_schema(&self, resource_type: &str) -> Option<Schema> {
        self.provider.schema().resources.remove(resource_type)
    }

    /// Resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Configure the provider, failing on any error diagnostic.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration, failing on any error diagnostic.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource that does not exist yet.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a change to an existing resource.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan removal of a resource.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a resource from a planned state.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource in place.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by ID.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// plan, create, read. Returns the refreshed state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Apply a changed config the way a host would.
    ///
    /// A replacement plan deletes the old resource and creates a new one; an
    /// in-place plan goes through `update`; an empty plan returns the prior
    /// state untouched.
    pub async fn lifecycle_apply_change(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        if plan.is_no_op() {
            return Ok(plan.planned_state);
        }
        if plan.requires_replace {
            self.delete(resource_type, prior_state).await?;
            let created = self.create(resource_type, plan.planned_state).await?;
            return self.read(resource_type, created).await;
        }
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// plan destroy, delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// import, then read the imported state back.
    pub async fn lifecycle_import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Value, ProviderError> {
        let imported = self.import_resource(resource_type, id).await?;
        let state = imported
            .into_iter()
            .next()
            .map(|r| r.state)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        self.read(resource_type, state).await
    }
}

/// A tester call that failed with a provider error or error diagnostics.
#[derive(Debug, Error)]
pub enum TestError {
    /// The operation returned error diagnostics.
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed outright.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!(
        "Operation failed with {} diagnostic(s):\n",
        diagnostics.len()
    );
    for diag in diagnostics {
        out.push_str(&format!("  [{:?}] {}", diag.severity, diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
        out.push('\n');
    }
    out
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan creates the resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan destroys and recreates the resource.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan changes `path`, and whether that change forces
/// replacement.
///
/// # Panics
///
/// Panics if no change for `path` exists or its replacement flag differs.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str, requires_replace: bool) {
    let change = plan.changes.iter().find(|c| c.path == path);
    match change {
        Some(change) => assert_eq!(
            change.requires_replace, requires_replace,
            "Expected change to '{}' to have requires_replace = {}",
            path, requires_replace
        ),
        None => panic!(
            "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
            path,
            plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
        ),
    }
}

/// Assert that `state` carries exactly the top-level keys of `schema`.
///
/// # Panics
///
/// Panics if `state` is not an object, misses a schema key, or has extra keys.
pub fn assert_state_matches_schema(schema: &Schema, state: &Value) {
    let obj = state
        .as_object()
        .unwrap_or_else(|| panic!("Expected state to be an object, got {}", state));
    let expected = schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys());
    for key in expected.clone() {
        assert!(obj.contains_key(key), "State is missing attribute '{}'", key);
    }
    let extra: Vec<_> = obj
        .keys()
        .filter(|k| !expected.clone().any(|e| e == *k))
        .collect();
    assert!(extra.is_empty(), "State has attributes not in the schema: {:?}", extra);
}

/// Assert that an error renders with the given diagnostic summary.
///
/// # Panics
///
/// Panics if the summaries differ.
pub fn assert_error_summary(err: &ProviderError, summary: &str) {
    let diagnostic = err.to_diagnostic();
    assert_eq!(
        diagnostic.summary, summary,
        "Unexpected diagnostic summary (detail: {:?})",
        diagnostic.detail
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error whose summary contains
/// `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let found = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));
    assert!(
        found,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::VOLUME;
    use crate::UnikraftCloudProvider;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn tester() -> ProviderTester<UnikraftCloudProvider> {
        ProviderTester::new(UnikraftCloudProvider::new().with_env(no_env))
    }

    fn volume_state() -> Value {
        json!({
            "uuid": "vol-1",
            "name": "data",
            "size_mb": 16,
            "template": null,
            "created_at": "2026-01-01T00:00:00Z",
            "state": "available",
            "persistent": true,
            "attached_to": null
        })
    }

    #[tokio::test]
    async fn test_configure_reports_diagnostics() {
        let err = tester().configure(json!({})).await.unwrap_err();
        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_error_contains(&diagnostics, "Missing Unikraft Cloud API Token")
            },
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_configure_succeeds() {
        tester()
            .configure(json!({"metro": "http://127.0.0.1:9", "token": "t"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_plan_create() {
        let plan = tester()
            .plan_create(VOLUME, json!({"name": "data", "size_mb": 16}))
            .await
            .unwrap();
        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "size_mb", false);
        assert!(plan.planned_state["uuid"].is_null());
    }

    #[tokio::test]
    async fn test_plan_without_changes() {
        let state = volume_state();
        let plan = tester()
            .plan_update(VOLUME, state.clone(), state.clone())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state, state);
    }

    #[tokio::test]
    async fn test_apply_unchanged_config_skips_the_api() {
        let state = volume_state();
        let applied = tester()
            .lifecycle_apply_change(VOLUME, state.clone(), state.clone())
            .await
            .unwrap();
        assert_eq!(applied, state);
    }

    #[tokio::test]
    async fn test_plan_replace() {
        let mut proposed = volume_state();
        proposed["name"] = json!("renamed");
        let plan = tester()
            .plan_update(VOLUME, volume_state(), proposed)
            .await
            .unwrap();
        assert_plan_replaces(&plan);
        assert_plan_changes_attribute(&plan, "name", true);
        assert!(plan.planned_state["uuid"].is_null());
    }

    #[tokio::test]
    async fn test_update_error_summary() {
        let err = tester()
            .update(VOLUME, volume_state(), volume_state())
            .await
            .unwrap_err();
        assert_error_summary(&err, "Update Not Supported");
    }

    #[test]
    fn test_assert_state_matches_schema() {
        let schema = tester().resource_schema(VOLUME).unwrap();
        assert_state_matches_schema(&schema, &volume_state());
    }

    #[test]
    #[should_panic(expected = "State is missing attribute")]
    fn test_assert_state_matches_schema_fails() {
        let schema = tester().resource_schema(VOLUME).unwrap();
        assert_state_matches_schema(&schema, &json!({"uuid": "vol-1"}));
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        assert_no_errors(&[Diagnostic::error("An error")]);
    }

    #[test]
    fn test_assert_no_errors_ignores_warnings() {
        assert_no_errors(&[Diagnostic::warning("Just a warning")]);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("token"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = err.to_string();
        assert!(display.contains("2 diagnostic(s)"));
        assert!(display.contains("First error"));
        assert!(display.contains("(at token)"));
        assert!(display.contains("Second error: More info"));
    }
}
