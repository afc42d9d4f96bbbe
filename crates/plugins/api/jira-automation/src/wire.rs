//! Jira Automation API response types.
//!
//! Only the fields the client reads are modelled; rule bodies stay as
//! `serde_json::Value` so nothing the API adds is lost on update.

use autorule_core::RuleSummary;
use serde::Deserialize;
use serde_json::Value;

// =============================================================================
// Tenant bootstrap
// =============================================================================

/// `GET <site>/_edge/tenant_info`
#[derive(Debug, Clone, Deserialize)]
pub struct TenantInfo {
    #[serde(rename = "cloudId")]
    pub cloud_id: String,
}

/// `GET <site>/rest/api/3/myself`
#[derive(Debug, Clone, Deserialize)]
pub struct Myself {
    #[serde(rename = "accountId")]
    pub account_id: String,
}

// =============================================================================
// Rules
// =============================================================================

/// One page of `GET /rule/summary`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSummaryPage {
    #[serde(default)]
    pub data: Vec<RuleSummary>,
    /// Cursor of the next page; empty or absent on the last page
    #[serde(default)]
    pub cursor: Option<String>,
}

/// `{"rule": ...}` envelope of `GET /rule/{uuid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEnvelope {
    pub rule: Value,
}

/// Response of `POST /rule`. Tenants answer with either key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRuleResponse {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, rename = "ruleUuid")]
    pub rule_uuid: Option<String>,
}

impl CreateRuleResponse {
    pub fn into_uuid(self) -> Option<String> {
        self.uuid
            .filter(|u| !u.is_empty())
            .or(self.rule_uuid.filter(|u| !u.is_empty()))
    }
}
