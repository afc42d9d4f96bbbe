//! Remote API types shared between the client and the engine.
//!
//! These mirror what the Jira Automation REST API sends and accepts.
//! Trigger and component trees stay as `serde_json::Value`: their shape is
//! owned by the codec, not by this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scope ARI segment that introduces a project id.
const PROJECT_SCOPE_MARKER: &str = ":project/";

// =============================================================================
// Rule state
// =============================================================================

/// Enabled/disabled status of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleState {
    Enabled,
    Disabled,
}

impl RuleState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            RuleState::Enabled
        } else {
            RuleState::Disabled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleState::Enabled => "ENABLED",
            RuleState::Disabled => "DISABLED",
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, RuleState::Enabled)
    }
}

/// Payload for `PUT /rule/{uuid}/state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRuleStateRequest {
    pub value: RuleState,
}

// =============================================================================
// Rules
// =============================================================================

/// One entry of `GET /rule/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Full rule object as returned inside the `{"rule": ...}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRule {
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "ruleScopeARIs")]
    pub rule_scope_aris: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub trigger: Value,
    #[serde(default)]
    pub components: Vec<Value>,
}

impl RemoteRule {
    pub fn is_enabled(&self) -> bool {
        self.state == RuleState::Enabled.as_str()
    }

    /// Project id of the rule when it is scoped to exactly one project.
    pub fn single_project_id(&self) -> Option<&str> {
        match self.rule_scope_aris.as_slice() {
            [only] => project_id_from_scope(only),
            _ => None,
        }
    }
}

/// Input for creating a rule. The client adds the API-mandated fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRuleRequest {
    pub name: String,
    /// Target project; `None` scopes the rule to the whole site.
    pub project_id: Option<String>,
    pub trigger: Value,
    pub components: Vec<Value>,
}

/// The fields an update replaces on top of the current remote rule.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRuleRequest {
    pub name: String,
    pub trigger: Value,
    pub components: Vec<Value>,
}

// =============================================================================
// Labels
// =============================================================================

/// A project-scoped rule label from the label sub-API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
}

/// Extract the project id from a scope ARI
/// (`ari:cloud:jira:<cloud>:project/<id>`).
pub fn project_id_from_scope(ari: &str) -> Option<&str> {
    let idx = ari.rfind(PROJECT_SCOPE_MARKER)?;
    let id = &ari[idx + PROJECT_SCOPE_MARKER.len()..];
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
