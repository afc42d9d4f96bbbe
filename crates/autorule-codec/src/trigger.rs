//! Trigger codec.

use autorule_core::{Args, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::{TriggerKind, COMPONENT_TRIGGER};

/// `{"type": "NAME", "value": ...}` status reference used by the transition
/// trigger.
#[derive(Debug, Deserialize)]
struct StatusRef {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitionValue {
    #[serde(default)]
    from_status: Vec<StatusRef>,
    #[serde(default)]
    to_status: Vec<StatusRef>,
}

/// Build the API JSON of a trigger.
pub fn build_trigger(
    kind: TriggerKind,
    args: &Args,
    cloud_id: &str,
    project_id: Option<&str>,
) -> Result<Value> {
    match kind {
        TriggerKind::StatusTransition => build_status_transition(args, cloud_id, project_id),
    }
}

/// Recover the arguments of a trigger of the given kind.
pub fn parse_trigger(kind: TriggerKind, raw: &Value) -> Result<Args> {
    match kind {
        TriggerKind::StatusTransition => parse_status_transition(raw),
    }
}

fn status_ref(name: &str) -> Value {
    json!({"type": "NAME", "value": name})
}

fn build_status_transition(args: &Args, cloud_id: &str, project_id: Option<&str>) -> Result<Value> {
    let kind = TriggerKind::StatusTransition;
    let required = |name: &str| {
        args.get(name)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing_argument(kind.name(), name))
    };
    let from_status = required("from_status")?;
    let to_status = required("to_status")?;

    let event_filters: Vec<String> = project_id
        .filter(|p| !p.is_empty())
        .map(|p| vec![format!("ari:cloud:jira:{}:project/{}", cloud_id, p)])
        .unwrap_or_default();

    Ok(json!({
        "component": COMPONENT_TRIGGER,
        "schemaVersion": kind.schema_version(),
        "type": kind.api_type(),
        "value": {
            "eventFilters": event_filters,
            "eventKey": "jira:issue_updated",
            "issueEvent": "issue_generic",
            "fromStatus": [status_ref(from_status)],
            "toStatus": [status_ref(to_status)],
        },
        "conditions": [],
        "connectionId": null,
    }))
}

fn parse_status_transition(raw: &Value) -> Result<Args> {
    let value = match raw.get("value") {
        None | Some(Value::Null) => TransitionValue::default(),
        Some(v) => TransitionValue::deserialize(v)
            .map_err(|e| Error::malformed(format!("status transition trigger value: {}", e)))?,
    };

    let mut args = Args::new();
    if let Some(from) = value.from_status.first() {
        args.insert("from_status".to_string(), from.value.clone());
    }
    if let Some(to) = value.to_status.first() {
        args.insert("to_status".to_string(), to.value.clone());
    }
    Ok(args)
}
