//! Add-only label synchronization.
//!
//! Labels live in a project-scoped internal API: a label must already exist
//! in the project and is attached to a rule by id. Nothing here ever fails
//! an apply; every problem becomes a [`Warning`].

use std::collections::BTreeSet;

use autorule_core::{RuleApi, Warning};
use tracing::{debug, info};

/// Label attached to every rule this tool manages.
pub const MANAGED_LABEL: &str = "managed-by:terraform";

/// Labels a rule should carry: declared ∪ previously observed ∪ the
/// managed marker.
pub fn desired_labels(declared: &[String], observed: &[String]) -> BTreeSet<String> {
    declared
        .iter()
        .chain(observed)
        .cloned()
        .chain(std::iter::once(MANAGED_LABEL.to_string()))
        .collect()
}

/// Result of one synchronization pass.
#[derive(Debug, Default)]
pub struct LabelSync {
    pub added: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Attach every desired label the rule does not carry yet.
///
/// Only rules scoped to a single project can be labelled; for any other
/// scope this is a no-op.
pub async fn sync_labels<A: RuleApi>(
    api: &A,
    rule_id: &str,
    project_id: Option<&str>,
    current: &[String],
    desired: &BTreeSet<String>,
) -> LabelSync {
    let mut result = LabelSync::default();

    let missing: Vec<&String> = desired.iter().filter(|l| !current.contains(l)).collect();
    if missing.is_empty() {
        return result;
    }
    let Some(project_id) = project_id else {
        debug!(rule_id = rule_id, "Rule is not scoped to one project; skipping labels");
        return result;
    };

    let available = match api.list_labels(project_id).await {
        Ok(labels) => labels,
        Err(e) => {
            result.warnings.push(Warning::new(
                "Could not list labels",
                format!(
                    "Could not list labels for project {}: {}. Create a '{}' label in the Jira UI to tag managed rules.",
                    project_id, e, MANAGED_LABEL
                ),
            ));
            return result;
        }
    };

    for name in missing {
        let Some(label) = available.iter().find(|l| &l.name == name) else {
            result.warnings.push(Warning::new(
                format!("Label '{}' not found", name),
                format!(
                    "No label named '{}' exists in project {}. Go to Project Settings → Automation → Labels to create it.",
                    name, project_id
                ),
            ));
            continue;
        };

        match api.add_label_to_rule(project_id, rule_id, label.id).await {
            Ok(()) => {
                info!(rule_id = rule_id, label = name.as_str(), "Added label to rule");
                result.added.push(name.clone());
            }
            Err(e) => result.warnings.push(Warning::new(
                "Could not add label",
                format!("Could not add label '{}' to rule {}: {}", name, rule_id, e),
            )),
        }
    }

    result
}
