//! Collaborator-facing value objects.
//!
//! A [`RuleSpec`] is what a front end wants a rule to look like; a
//! [`RuleView`] is the normalized current state read back from the API.
//! Both use the friendly, structured representation where possible and fall
//! back to raw JSON for anything outside the codec's catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Argument map of a trigger, action or condition.
pub type Args = BTreeMap<String, String>;

/// User-facing kind name of the condition branch.
pub const CONDITION_KIND: &str = "condition";

/// User-facing kind name of the raw JSON escape hatch.
pub const RAW_KIND: &str = "raw";

// =============================================================================
// Trigger
// =============================================================================

/// Desired trigger: a catalog kind with arguments, or verbatim API JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriggerWire", into = "TriggerWire")]
pub enum TriggerSpec {
    Structured { kind: String, args: Args },
    Raw(Value),
}

impl TriggerSpec {
    pub fn structured(kind: impl Into<String>, args: Args) -> Self {
        TriggerSpec::Structured {
            kind: kind.into(),
            args,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, TriggerSpec::Raw(_))
    }
}

#[derive(Serialize, Deserialize)]
struct TriggerWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    args: Args,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    json: Option<Value>,
}

impl TryFrom<TriggerWire> for TriggerSpec {
    type Error = String;

    fn try_from(wire: TriggerWire) -> Result<Self, Self::Error> {
        if wire.kind == RAW_KIND {
            return wire
                .json
                .map(TriggerSpec::Raw)
                .ok_or_else(|| "raw trigger requires a 'json' field".to_string());
        }
        if wire.json.is_some() {
            return Err(format!("trigger {:?} does not take a 'json' field", wire.kind));
        }
        Ok(TriggerSpec::Structured {
            kind: wire.kind,
            args: wire.args,
        })
    }
}

impl From<TriggerSpec> for TriggerWire {
    fn from(spec: TriggerSpec) -> Self {
        match spec {
            TriggerSpec::Structured { kind, args } => TriggerWire {
                kind,
                args,
                json: None,
            },
            TriggerSpec::Raw(json) => TriggerWire {
                kind: RAW_KIND.to_string(),
                args: Args::new(),
                json: Some(json),
            },
        }
    }
}

// =============================================================================
// Components
// =============================================================================

/// A leaf action: catalog kind plus arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: Args,
}

impl ActionSpec {
    pub fn new(kind: impl Into<String>, args: Args) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }
}

/// An IF/ELSE branch: comparison args (`first`, `operator`, `second`) and
/// the actions of each side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionSpec {
    pub args: Args,
    pub then: Vec<ActionSpec>,
    pub otherwise: Vec<ActionSpec>,
}

/// One node of a rule's ordered component list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ComponentWire", into = "ComponentWire")]
pub enum ComponentSpec {
    Action(ActionSpec),
    Condition(ConditionSpec),
    Raw(Value),
}

impl ComponentSpec {
    pub fn action(kind: impl Into<String>, args: Args) -> Self {
        ComponentSpec::Action(ActionSpec::new(kind, args))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ComponentSpec::Raw(_))
    }
}

#[derive(Serialize, Deserialize)]
struct ComponentWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    args: Args,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    then: Option<Vec<ActionSpec>>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    otherwise: Option<Vec<ActionSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    json: Option<Value>,
}

impl TryFrom<ComponentWire> for ComponentSpec {
    type Error = String;

    fn try_from(wire: ComponentWire) -> Result<Self, Self::Error> {
        match wire.kind.as_str() {
            RAW_KIND => wire
                .json
                .map(ComponentSpec::Raw)
                .ok_or_else(|| "raw component requires a 'json' field".to_string()),
            CONDITION_KIND => Ok(ComponentSpec::Condition(ConditionSpec {
                args: wire.args,
                then: wire.then.unwrap_or_default(),
                otherwise: wire.otherwise.unwrap_or_default(),
            })),
            kind => {
                if wire.then.is_some() || wire.otherwise.is_some() {
                    return Err(format!("action {:?} cannot have then/else blocks", kind));
                }
                Ok(ComponentSpec::Action(ActionSpec {
                    kind: wire.kind,
                    args: wire.args,
                }))
            }
        }
    }
}

impl From<ComponentSpec> for ComponentWire {
    fn from(spec: ComponentSpec) -> Self {
        match spec {
            ComponentSpec::Action(action) => ComponentWire {
                kind: action.kind,
                args: action.args,
                then: None,
                otherwise: None,
                json: None,
            },
            ComponentSpec::Condition(cond) => ComponentWire {
                kind: CONDITION_KIND.to_string(),
                args: cond.args,
                then: Some(cond.then),
                otherwise: if cond.otherwise.is_empty() {
                    None
                } else {
                    Some(cond.otherwise)
                },
                json: None,
            },
            ComponentSpec::Raw(json) => ComponentWire {
                kind: RAW_KIND.to_string(),
                args: Args::new(),
                then: None,
                otherwise: None,
                json: Some(json),
            },
        }
    }
}

// =============================================================================
// Rule specification and view
// =============================================================================

fn default_enabled() -> bool {
    true
}

/// Desired state of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Numeric project id used to scope the rule and its trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    /// Labels to add. Labels are never removed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl RuleSpec {
    /// Whether any component uses the raw escape hatch.
    pub fn has_raw_components(&self) -> bool {
        self.components.iter().any(ComponentSpec::is_raw)
    }
}

/// Normalized current state of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleView {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub state: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub trigger: TriggerSpec,
    pub components: Vec<ComponentSpec>,
}

impl RuleView {
    /// Turn the view back into a spec that would reproduce it.
    pub fn to_spec(&self) -> RuleSpec {
        let project_id = match self.scope.as_slice() {
            [only] => crate::types::project_id_from_scope(only).map(str::to_string),
            _ => None,
        };
        RuleSpec {
            name: self.name.clone(),
            enabled: self.enabled,
            project_id,
            trigger: self.trigger.clone(),
            components: self.components.clone(),
            labels: self.labels.clone(),
        }
    }
}

/// A non-fatal problem the caller should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub summary: String,
    pub detail: String,
}

impl Warning {
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// Result of an operation together with the warnings it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }
}
