//! Request bodies for rule create and update.
//!
//! Updates are read-modify-write: the full current rule is fetched, the
//! managed fields are replaced, and the whole object goes back. Everything
//! else the API returned (actor, scope, notification settings...) stays as
//! the API sent it.

use autorule_core::{CreateRuleRequest, Error, Result, UpdateRuleRequest};
use serde_json::{json, Map, Value};

/// Fields of a fetched rule the update endpoint refuses.
pub const READ_ONLY_FIELDS: &[&str] = &["uuid", "created", "updated"];

const NESTED_LISTS: &[&str] = &["children", "conditions"];

/// Wrap a rule object as `{"rule": ...}`.
pub fn envelope(rule: Value) -> Value {
    json!({ "rule": rule })
}

/// Scope ARI of a project, or of the whole site when `project_id` is `None`.
pub fn scope_ari(cloud_id: &str, project_id: Option<&str>) -> String {
    match project_id.filter(|p| !p.is_empty()) {
        Some(project) => format!("ari:cloud:jira:{}:project/{}", cloud_id, project),
        None => format!("ari:cloud:jira::site/{}", cloud_id),
    }
}

/// Copy of a component (and its nested children and conditions) without
/// server-assigned ids: `id` removed, parent pointers set to null.
pub fn strip_component_ids(component: &Value) -> Value {
    let Value::Object(node) = component else {
        return component.clone();
    };

    let mut out = Map::new();
    for (key, value) in node {
        match key.as_str() {
            "id" => continue,
            "parentId" | "conditionParentId" => {
                out.insert(key.clone(), Value::Null);
            }
            k if NESTED_LISTS.contains(&k) => {
                let stripped = match value {
                    Value::Array(items) => Value::Array(items.iter().map(strip_component_ids).collect()),
                    other => other.clone(),
                };
                out.insert(key.clone(), stripped);
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn strip_all(components: &[Value]) -> Vec<Value> {
    components.iter().map(strip_component_ids).collect()
}

/// Enveloped body for `PUT /rule/{uuid}` built from the current rule.
pub fn prepare_update(current: &Value, update: &UpdateRuleRequest) -> Result<Value> {
    let Value::Object(current) = current else {
        return Err(Error::malformed("current rule is not a JSON object"));
    };

    let mut rule = current.clone();
    for field in READ_ONLY_FIELDS {
        rule.remove(*field);
    }
    rule.insert("name".to_string(), Value::String(update.name.clone()));
    rule.insert("trigger".to_string(), strip_component_ids(&update.trigger));
    rule.insert(
        "components".to_string(),
        Value::Array(strip_all(&update.components)),
    );

    Ok(envelope(Value::Object(rule)))
}

/// Enveloped body for `POST /rule`. New rules always start disabled.
pub fn create_payload(request: &CreateRuleRequest, cloud_id: &str, account_id: &str) -> Value {
    envelope(json!({
        "name": request.name,
        "state": "DISABLED",
        "notifyOnError": "FIRSTERROR",
        "canOtherRuleTrigger": false,
        "authorAccountId": account_id,
        "actor": {
            "type": "ACCOUNT_ID",
            "actor": account_id,
        },
        "writeAccessType": "OWNER_ONLY",
        "ruleScopeARIs": [scope_ari(cloud_id, request.project_id.as_deref())],
        "trigger": strip_component_ids(&request.trigger),
        "components": strip_all(&request.components),
    }))
}
