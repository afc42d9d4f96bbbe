//! Registry of the component kinds the codec understands.
//!
//! Each kind has a user-facing name (used in rule specs) and an API type tag
//! (used in the component JSON). The registry is built once and shared by
//! reference; lookups in either direction go through it.

use std::collections::HashMap;
use std::fmt;

use autorule_core::{Error, Result};
use regex::Regex;

// =============================================================================
// Wire constants
// =============================================================================

pub const COMPONENT_TRIGGER: &str = "TRIGGER";
pub const COMPONENT_ACTION: &str = "ACTION";
pub const COMPONENT_CONDITION: &str = "CONDITION";
pub const COMPONENT_CONDITION_BLOCK: &str = "CONDITION_BLOCK";

pub const CONDITION_CONTAINER_TYPE: &str = "jira.condition.container.block";
pub const CONDITION_BLOCK_TYPE: &str = "jira.condition.if.block";
pub const COMPARATOR_TYPE: &str = "jira.comparator.condition";

/// Prefix shared by every debug log entry emitted before a webhook.
pub const DEBUG_LOG_PREFIX: &str = "[DEBUG add_release_related_work] ";

const RELATEDWORK_URL_PATTERN: &str = r####"^https://api\.atlassian\.com/ex/jira/[^/]+/rest/api/3/version/\{\{issue\.([^.]+)\.format\("###"\)\}\}/relatedwork$"####;

// =============================================================================
// Kinds
// =============================================================================

/// Trigger kinds with a structured representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    StatusTransition,
}

impl TriggerKind {
    pub const ALL: &'static [TriggerKind] = &[TriggerKind::StatusTransition];

    pub fn name(self) -> &'static str {
        match self {
            TriggerKind::StatusTransition => "status_transition",
        }
    }

    pub fn api_type(self) -> &'static str {
        match self {
            TriggerKind::StatusTransition => "jira.issue.event.trigger:transitioned",
        }
    }

    pub fn schema_version(self) -> u32 {
        match self {
            TriggerKind::StatusTransition => 1,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action kinds with a structured representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Log,
    Comment,
    AddReleaseRelatedWork,
}

impl ActionKind {
    pub const ALL: &'static [ActionKind] = &[
        ActionKind::Log,
        ActionKind::Comment,
        ActionKind::AddReleaseRelatedWork,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Log => "log",
            ActionKind::Comment => "comment",
            ActionKind::AddReleaseRelatedWork => "add_release_related_work",
        }
    }

    pub fn api_type(self) -> &'static str {
        match self {
            ActionKind::Log => "codebarrel.action.log",
            ActionKind::Comment => "jira.issue.comment",
            ActionKind::AddReleaseRelatedWork => "jira.issue.outgoing.webhook",
        }
    }

    pub fn schema_version(self) -> u32 {
        match self {
            ActionKind::Log => 1,
            ActionKind::Comment => 2,
            ActionKind::AddReleaseRelatedWork => 1,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Lookup tables for every supported kind.
#[derive(Debug, Clone)]
pub struct Catalog {
    triggers_by_name: HashMap<&'static str, TriggerKind>,
    triggers_by_type: HashMap<&'static str, TriggerKind>,
    actions_by_name: HashMap<&'static str, ActionKind>,
    actions_by_type: HashMap<&'static str, ActionKind>,
    relatedwork_url: Regex,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            triggers_by_name: TriggerKind::ALL.iter().map(|k| (k.name(), *k)).collect(),
            triggers_by_type: TriggerKind::ALL.iter().map(|k| (k.api_type(), *k)).collect(),
            actions_by_name: ActionKind::ALL.iter().map(|k| (k.name(), *k)).collect(),
            actions_by_type: ActionKind::ALL.iter().map(|k| (k.api_type(), *k)).collect(),
            relatedwork_url: Regex::new(RELATEDWORK_URL_PATTERN)
                .expect("relatedwork URL pattern is valid"),
        }
    }

    pub fn trigger_by_name(&self, name: &str) -> Result<TriggerKind> {
        self.triggers_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::unrecognized("trigger type", name))
    }

    pub fn trigger_by_type(&self, api_type: &str) -> Result<TriggerKind> {
        self.triggers_by_type
            .get(api_type)
            .copied()
            .ok_or_else(|| Error::unrecognized("trigger API type", api_type))
    }

    pub fn action_by_name(&self, name: &str) -> Result<ActionKind> {
        self.actions_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::unrecognized("action type", name))
    }

    pub fn action_by_type(&self, api_type: &str) -> Result<ActionKind> {
        self.actions_by_type
            .get(api_type)
            .copied()
            .ok_or_else(|| Error::unrecognized("action API type", api_type))
    }

    /// Field id embedded in a relatedwork webhook URL, if the URL has the
    /// shape this codec builds.
    pub fn relatedwork_field<'a>(&self, url: &'a str) -> Option<&'a str> {
        self.relatedwork_url
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
