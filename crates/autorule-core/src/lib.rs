//! Core traits, types, and error handling for autorule.
//!
//! This crate provides the foundational abstractions used across all autorule
//! components: the error taxonomy, configuration, the rule value objects that
//! cross the boundary to front ends, and the [`RuleApi`] seam to the remote
//! Jira Automation API.

pub mod config;
pub mod error;
pub mod provider;
pub mod spec;
pub mod types;

pub use error::{Error, Location, Result};
pub use provider::RuleApi;
pub use spec::{
    ActionSpec, Args, ComponentSpec, ConditionSpec, Outcome, RuleSpec, RuleView, TriggerSpec,
    Warning, CONDITION_KIND, RAW_KIND,
};
pub use types::{
    project_id_from_scope, CreateRuleRequest, Label, RemoteRule, RuleState, RuleSummary,
    SetRuleStateRequest, UpdateRuleRequest,
};
