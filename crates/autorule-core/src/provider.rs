//! Trait for the remote automation rule API.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{CreateRuleRequest, Label, RemoteRule, RuleSummary, UpdateRuleRequest};

/// Remote automation rule API (Jira Automation REST API v1 plus the
/// label sub-API).
///
/// Every method issues its requests one after another and returns whatever
/// the remote system answered; nothing is cached.
#[async_trait]
pub trait RuleApi: Send + Sync {
    /// All rule summaries, following pagination cursors to the end
    async fn list_rules(&self) -> Result<Vec<RuleSummary>>;

    /// The rule object, without the `{"rule": ...}` envelope
    async fn get_rule_raw(&self, uuid: &str) -> Result<Value>;

    /// The rule object decoded into its typed form
    async fn get_rule(&self, uuid: &str) -> Result<RemoteRule> {
        let raw = self.get_rule_raw(uuid).await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Create a disabled rule; returns the new identifier
    async fn create_rule(&self, request: CreateRuleRequest) -> Result<String>;

    /// Replace name, trigger and components of an existing rule
    async fn update_rule(&self, uuid: &str, request: UpdateRuleRequest) -> Result<()>;

    /// Enable or disable a rule
    async fn set_rule_state(&self, uuid: &str, enabled: bool) -> Result<()>;

    /// Rule labels defined for a project
    async fn list_labels(&self, project_id: &str) -> Result<Vec<Label>>;

    /// Attach an existing label to a rule
    async fn add_label_to_rule(&self, project_id: &str, uuid: &str, label_id: u64) -> Result<()>;
}
