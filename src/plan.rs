//! Schema-driven planning for resources that are never updated in place.
//!
//! Every Unikraft Cloud resource is immutable once created: a change to any
//! `force_new` attribute or block is planned as a replacement. Values the API
//! assigns (computed attributes) are unknown until the resource exists and
//! are planned as `null`.

use serde_json::{Map, Value};

use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a resource against its schema.
///
/// - no prior state: a create plan with every configured value as an added
///   change;
/// - `null` proposed state: a destroy plan;
/// - otherwise: a replacement when a `force_new` value differs, an in-place
///   change when only other values differ, and the prior state unchanged when
///   nothing differs.
pub fn plan_resource(
    schema: &Schema,
    prior_state: Option<Value>,
    proposed_state: Value,
) -> PlanResult {
    if proposed_state.is_null() {
        return PlanResult::destroy();
    }

    let proposed = proposed_state.as_object().cloned().unwrap_or_default();

    let prior = match prior_state {
        Some(Value::Object(prior)) => prior,
        _ => return plan_create(schema, proposed),
    };

    let mut changes = Vec::new();
    for (name, attr) in configurable_attributes(schema) {
        let after = proposed.get(name).cloned().unwrap_or(Value::Null);
        // Optional+computed values left unset keep whatever the API assigned.
        if after.is_null() && attr.flags.computed {
            continue;
        }
        let before = prior.get(name).cloned().unwrap_or(Value::Null);
        if before != after {
            let change = AttributeChange::modified(name.as_str(), before, after);
            changes.push(if attr.force_new {
                change.forcing_replacement()
            } else {
                change
            });
        }
    }
    for (name, block) in &schema.block.blocks {
        let before = normalize_block(prior.get(name));
        let after = normalize_block(proposed.get(name));
        if before != after {
            let change = AttributeChange::modified(name.as_str(), before, after);
            changes.push(if block.force_new {
                change.forcing_replacement()
            } else {
                change
            });
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(Value::Object(prior));
    }

    let requires_replace = changes.iter().any(|c| c.requires_replace);
    let planned = if requires_replace {
        unknown_computed(schema, proposed)
    } else {
        merge_computed(schema, proposed, &prior)
    };

    if requires_replace {
        PlanResult::replace(planned, changes)
    } else {
        PlanResult::update(planned, changes)
    }
}

fn plan_create(schema: &Schema, proposed: Map<String, Value>) -> PlanResult {
    let mut changes: Vec<AttributeChange> = configurable_attributes(schema)
        .filter_map(|(name, _)| {
            proposed
                .get(name)
                .filter(|v| !v.is_null())
                .map(|v| AttributeChange::added(name.as_str(), v.clone()))
        })
        .collect();
    changes.extend(schema.block.blocks.keys().filter_map(|name| {
        let value = normalize_block(proposed.get(name));
        (!value.is_null()).then(|| AttributeChange::added(name.as_str(), value))
    }));
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    PlanResult::create(unknown_computed(schema, proposed), changes)
}

fn configurable_attributes(schema: &Schema) -> impl Iterator<Item = (&String, &Attribute)> {
    schema
        .block
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.flags.is_computed_only())
}

/// Null out every value the API will assign.
fn unknown_computed(schema: &Schema, mut state: Map<String, Value>) -> Value {
    for (name, attr) in &schema.block.attributes {
        let unset = state.get(name).map_or(true, Value::is_null);
        if attr.flags.is_computed_only() || (attr.flags.computed && unset) {
            state.insert(name.clone(), Value::Null);
        }
    }
    Value::Object(state)
}

/// Carry computed values over from the prior state.
fn merge_computed(
    schema: &Schema,
    mut state: Map<String, Value>,
    prior: &Map<String, Value>,
) -> Value {
    for (name, attr) in &schema.block.attributes {
        let unset = state.get(name).map_or(true, Value::is_null);
        if attr.flags.computed && unset {
            state.insert(name.clone(), prior.get(name).cloned().unwrap_or(Value::Null));
        }
    }
    Value::Object(state)
}

/// An empty list block is the same as an absent one.
fn normalize_block(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) if items.is_empty() => Value::Null,
        Some(value) => value.clone(),
        None => Value::Null,
    }
}
