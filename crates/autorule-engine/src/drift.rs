//! Drift detection between a desired spec and the current view.

use autorule_codec::{canonicalize, Codec};
use autorule_core::{Result, RuleSpec, RuleView};
use serde_json::Value;

/// Names of the rule fields whose desired and current values differ.
///
/// Trigger and components are compared on their canonical built form, so
/// structured and raw declarations of the same rule agree. Labels only
/// drift when a desired label is missing; extra labels never count.
pub fn diff(codec: &Codec, spec: &RuleSpec, view: &RuleView) -> Result<Vec<&'static str>> {
    let project_id = spec.project_id.as_deref();
    let mut changed = Vec::new();

    if spec.name != view.name {
        changed.push("name");
    }
    if spec.enabled != view.enabled {
        changed.push("enabled");
    }

    let desired = codec.build_trigger(&spec.trigger, project_id)?;
    let current = codec.build_trigger(&view.trigger, project_id)?;
    if canonicalize(&desired) != canonicalize(&current) {
        changed.push("trigger");
    }

    let desired = Value::Array(codec.build_components(&spec.components)?);
    let current = Value::Array(codec.build_components(&view.components)?);
    if canonicalize(&desired) != canonicalize(&current) {
        changed.push("components");
    }

    if spec.labels.iter().any(|l| !view.labels.contains(l)) {
        changed.push("labels");
    }

    Ok(changed)
}
