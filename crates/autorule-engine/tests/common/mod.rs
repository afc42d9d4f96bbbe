//! In-memory Automation API used by the lifecycle tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use autorule_codec::{AliasMap, BuildContext, Codec, WebhookCredentials};
use autorule_core::{
    Args, CreateRuleRequest, Error, Label, Result, RuleApi, RuleState, RuleSummary,
    UpdateRuleRequest,
};
use autorule_jira::payload::{create_payload, prepare_update};
use serde_json::{json, Value};

pub const CLOUD_ID: &str = "c1";
pub const PROJECT_ID: &str = "10001";

#[derive(Default)]
struct State {
    rules: BTreeMap<String, Value>,
    labels: BTreeMap<String, Vec<Label>>,
    calls: Vec<String>,
    next_rule: u64,
    next_component: u64,
}

/// Stores rules the way the API does: assigns component ids, keeps every
/// field it was sent and answers reads with the stored object.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake with the managed marker and `release` labels defined in
    /// [`PROJECT_ID`].
    pub fn with_project_labels() -> Self {
        let api = Self::new();
        api.define_labels(PROJECT_ID, &["managed-by:terraform", "release"]);
        api
    }

    pub fn define_labels(&self, project_id: &str, names: &[&str]) {
        let labels = names
            .iter()
            .enumerate()
            .map(|(i, name)| Label {
                id: i as u64 + 1,
                name: name.to_string(),
            })
            .collect();
        self.lock().labels.insert(project_id.to_string(), labels);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn rule(&self, id: &str) -> Value {
        self.lock().rules[id].clone()
    }

    pub fn insert_rule(&self, id: &str, rule: Value) {
        self.lock().rules.insert(id.to_string(), rule);
    }

    /// Change a stored rule behind the manager's back.
    pub fn edit_rule(&self, id: &str, edit: impl FnOnce(&mut Value)) {
        let mut state = self.lock();
        if let Some(rule) = state.rules.get_mut(id) {
            edit(rule);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

fn assign_ids(node: &mut Value, next: &mut u64, parent: Option<&str>, parent_key: &str) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    *next += 1;
    let id = next.to_string();
    obj.insert("id".to_string(), json!(id));
    if let Some(parent) = parent {
        obj.insert(parent_key.to_string(), json!(parent));
    }
    for (key, child_parent_key) in [("children", "parentId"), ("conditions", "conditionParentId")] {
        if let Some(Value::Array(items)) = obj.get_mut(key) {
            for item in items {
                assign_ids(item, next, Some(&id), child_parent_key);
            }
        }
    }
}

impl State {
    fn store(&mut self, id: &str, mut rule: Value) {
        if let Some(trigger) = rule.get_mut("trigger") {
            assign_ids(trigger, &mut self.next_component, None, "parentId");
        }
        if let Some(Value::Array(components)) = rule.get_mut("components") {
            for component in components {
                assign_ids(component, &mut self.next_component, None, "parentId");
            }
        }
        rule["uuid"] = json!(id);
        rule["updated"] = json!("2024-06-01T00:00:00Z");
        self.rules.insert(id.to_string(), rule);
    }
}

#[async_trait]
impl RuleApi for FakeApi {
    async fn list_rules(&self) -> Result<Vec<RuleSummary>> {
        self.record("list_rules".to_string());
        let state = self.lock();
        Ok(state
            .rules
            .values()
            .map(|r| {
                let rule_state = r["state"].as_str().unwrap_or_default().to_string();
                RuleSummary {
                    uuid: r["uuid"].as_str().unwrap_or_default().to_string(),
                    name: r["name"].as_str().unwrap_or_default().to_string(),
                    enabled: rule_state == "ENABLED",
                    state: rule_state,
                }
            })
            .collect())
    }

    async fn get_rule_raw(&self, uuid: &str) -> Result<Value> {
        self.record(format!("get_rule {}", uuid));
        self.lock()
            .rules
            .get(uuid)
            .cloned()
            .ok_or_else(|| Error::from_status(404, "Rule not found"))
    }

    async fn create_rule(&self, request: CreateRuleRequest) -> Result<String> {
        self.record("create_rule".to_string());
        let body = create_payload(&request, CLOUD_ID, "acc-1");
        let mut state = self.lock();
        state.next_rule += 1;
        let id = format!("r-{}", state.next_rule);
        let mut rule = body["rule"].clone();
        rule["created"] = json!("2024-06-01T00:00:00Z");
        rule["labels"] = json!([]);
        state.store(&id, rule);
        Ok(id)
    }

    async fn update_rule(&self, uuid: &str, request: UpdateRuleRequest) -> Result<()> {
        let current = self.get_rule_raw(uuid).await?;
        self.record(format!("update_rule {}", uuid));
        let body = prepare_update(&current, &request)?;
        let mut rule = body["rule"].clone();
        rule["created"] = current["created"].clone();
        self.lock().store(uuid, rule);
        Ok(())
    }

    async fn set_rule_state(&self, uuid: &str, enabled: bool) -> Result<()> {
        self.record(format!("set_rule_state {} {}", uuid, enabled));
        let mut state = self.lock();
        let rule = state
            .rules
            .get_mut(uuid)
            .ok_or_else(|| Error::from_status(404, "Rule not found"))?;
        rule["state"] = json!(RuleState::from_enabled(enabled).as_str());
        Ok(())
    }

    async fn list_labels(&self, project_id: &str) -> Result<Vec<Label>> {
        self.record(format!("list_labels {}", project_id));
        Ok(self
            .lock()
            .labels
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_label_to_rule(&self, project_id: &str, uuid: &str, label_id: u64) -> Result<()> {
        self.record(format!("add_label {} {}", uuid, label_id));
        let mut state = self.lock();
        let name = state
            .labels
            .get(project_id)
            .and_then(|labels| labels.iter().find(|l| l.id == label_id))
            .map(|l| l.name.clone())
            .ok_or_else(|| Error::from_status(404, "Label not found"))?;
        let rule = state
            .rules
            .get_mut(uuid)
            .ok_or_else(|| Error::from_status(404, "Rule not found"))?;
        if let Some(Value::Array(labels)) = rule.get_mut("labels") {
            labels.push(json!(name));
        }
        Ok(())
    }
}

pub fn args(pairs: &[(&str, &str)]) -> Args {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn codec() -> Codec {
    let context = BuildContext::new(CLOUD_ID)
        .with_webhook(WebhookCredentials::new("bot@example.com", "secret"));
    let aliases = AliasMap::new([(
        "release_version".to_string(),
        "customfield_10709".to_string(),
    )]);
    Codec::new(context, aliases)
}
