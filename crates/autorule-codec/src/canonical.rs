//! Canonical form of trigger and component JSON.
//!
//! Two documents describe the same rule when their canonical strings are
//! equal. Canonicalization drops what the API assigns or enriches on its
//! own and orders object keys deterministically.

use autorule_core::{Error, Result};
use serde_json::{Map, Value};

/// Fields the API assigns to every component node.
pub const ASSIGNED_FIELDS: &[&str] = &["id", "parentId", "conditionParentId", "connectionId"];

/// Fields the API adds to a node's `value` object.
pub const ENRICHED_VALUE_FIELDS: &[&str] = &["eventFilters", "eventKey", "issueEvent"];

const NESTED_LISTS: &[&str] = &["children", "conditions"];

/// Canonical value of one node (or an array of nodes).
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Object(node) => canonical_node(node),
        other => other.clone(),
    }
}

fn canonical_node(node: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (key, value) in node {
        if ASSIGNED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if NESTED_LISTS.contains(&key.as_str()) {
            match value {
                Value::Array(items) if items.is_empty() => continue,
                Value::Array(items) => {
                    out.insert(key.clone(), Value::Array(items.iter().map(canonical_value).collect()));
                    continue;
                }
                _ => {}
            }
        }
        if key == "value" {
            if let Value::Object(inner) = value {
                let kept = inner
                    .iter()
                    .filter(|(k, _)| !ENRICHED_VALUE_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect();
                out.insert(key.clone(), Value::Object(kept));
                continue;
            }
        }
        out.insert(key.clone(), sorted(value));
    }
    Value::Object(sort_keys(out))
}

/// Copy of `value` with every object's keys in sorted order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        Value::Object(map) => {
            let rebuilt = map.iter().map(|(k, v)| (k.clone(), sorted(v))).collect();
            Value::Object(sort_keys(rebuilt))
        }
        other => other.clone(),
    }
}

fn sort_keys(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().collect()
}

/// Canonical string of a node or node list.
pub fn canonicalize(value: &Value) -> String {
    canonical_value(value).to_string()
}

/// Canonical string of a JSON document given as text.
pub fn canonicalize_str(json: &str) -> Result<String> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::malformed(format!("invalid JSON: {}", e)))?;
    Ok(canonicalize(&value))
}
