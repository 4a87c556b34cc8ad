//! Value types passed between the host and a [`ProviderService`](crate::ProviderService).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute path, e.g. `service_group.services`.
    pub path: String,
    /// Value before the change; `None` when the attribute is being set.
    pub before: Option<Value>,
    /// Value after the change; `None` when the attribute is being cleared.
    pub after: Option<Value>,
    /// Whether applying this change destroys and recreates the resource.
    #[serde(default)]
    pub requires_replace: bool,
}

impl AttributeChange {
    /// An attribute set on create.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
            requires_replace: false,
        }
    }

    /// An attribute whose value differs between prior and proposed state.
    ///
    /// A `null` on either side is recorded as absent.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before).filter(|v| !v.is_null()),
            after: Some(after).filter(|v| !v.is_null()),
            requires_replace: false,
        }
    }

    /// Mark this change as forcing replacement.
    pub fn forcing_replacement(mut self) -> Self {
        self.requires_replace = true;
        self
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state; `null` when the resource is being destroyed.
    pub planned_state: Value,
    /// The attribute-level changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Nothing to do; the state is carried over unchanged.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Plan for a resource that does not exist yet.
    pub fn create(planned_state: Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: false,
        }
    }

    /// Plan that changes the resource in place.
    pub fn update(planned_state: Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: false,
        }
    }

    /// Plan for removing the resource.
    pub fn destroy() -> Self {
        Self {
            planned_state: Value::Null,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Plan that recreates the resource with new values.
    pub fn replace(planned_state: Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: true,
        }
    }

    /// Whether the plan leaves the resource untouched.
    pub fn is_no_op(&self) -> bool {
        self.changes.is_empty() && !self.requires_replace && !self.planned_state.is_null()
    }
}

/// A resource brought under management by `import`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type name.
    pub resource_type: String,
    /// State read back from the API.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Summary of the types a provider serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names, sorted.
    pub resources: Vec<String>,
    /// Data source type names, sorted.
    pub data_sources: Vec<String>,
    /// Optional behaviors the provider supports.
    pub capabilities: ServerCapabilities,
}

/// Capability flags advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// `plan` accepts a `null` proposed state and returns a destroy plan.
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("image", json!("nginx:latest"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("nginx:latest")));
        assert!(!added.requires_replace);

        let modified = AttributeChange::modified("memory_mb", json!(128), json!(256))
            .forcing_replacement();
        assert_eq!(modified.before, Some(json!(128)));
        assert_eq!(modified.after, Some(json!(256)));
        assert!(modified.requires_replace);

        let cleared = AttributeChange::modified("name", json!("web"), Value::Null);
        assert_eq!(cleared.before, Some(json!("web")));
        assert!(cleared.after.is_none());
    }

    #[test]
    fn test_plan_result_shapes() {
        let state = json!({"uuid": "abc", "image": "nginx:latest"});
        assert!(PlanResult::no_change(state.clone()).is_no_op());

        let destroy = PlanResult::destroy();
        assert!(destroy.planned_state.is_null());
        assert!(!destroy.requires_replace);
        assert!(!destroy.is_no_op());

        let replace = PlanResult::replace(
            state.clone(),
            vec![AttributeChange::modified("image", json!("a"), json!("b")).forcing_replacement()],
        );
        assert!(replace.requires_replace);
        assert!(!replace.is_no_op());

        let create = PlanResult::create(state, vec![AttributeChange::added("image", json!("a"))]);
        assert!(!create.requires_replace);
        assert_eq!(create.changes.len(), 1);
    }

    #[test]
    fn test_change_serialization_defaults_replace_flag() {
        let change: AttributeChange =
            serde_json::from_value(json!({"path": "size_mb", "before": 1, "after": 2})).unwrap();
        assert!(!change.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("unikraft-cloud_volume", json!({"uuid": "c0ffee"}));
        assert_eq!(imported.resource_type, "unikraft-cloud_volume");
        assert_eq!(imported.state["uuid"], "c0ffee");
    }
}
