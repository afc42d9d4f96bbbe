//! The codec tying catalog, aliases and build context together.

use std::fmt;

use autorule_core::{
    ActionSpec, Args, ComponentSpec, ConditionSpec, Error, Result, TriggerSpec,
};
use serde_json::Value;
use tracing::debug;

use crate::action::{self, DEBUG_ARG};
use crate::alias::AliasMap;
use crate::catalog::{ActionKind, Catalog, CONDITION_CONTAINER_TYPE};
use crate::condition;
use crate::trigger;

/// Basic-auth pair embedded in outgoing webhook headers.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookCredentials {
    pub user: String,
    pub token: String,
}

impl WebhookCredentials {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for WebhookCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookCredentials")
            .field("user", &self.user)
            .field("token", &"***")
            .finish()
    }
}

/// Tenant-specific inputs to the build direction.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub cloud_id: String,
    pub webhook: Option<WebhookCredentials>,
}

impl BuildContext {
    pub fn new(cloud_id: impl Into<String>) -> Self {
        Self {
            cloud_id: cloud_id.into(),
            webhook: None,
        }
    }

    pub fn with_webhook(mut self, credentials: WebhookCredentials) -> Self {
        self.webhook = Some(credentials);
        self
    }
}

/// Where the read-back scan is relative to a run of debug log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebugScan {
    Idle,
    SawDebugRun,
}

impl DebugScan {
    /// Consume the state for a non-debug entry: whether the entry is a
    /// webhook that inherits `debug = "true"`, and the next state.
    fn settle(self, kind: Option<ActionKind>) -> (bool, DebugScan) {
        let debug = self == DebugScan::SawDebugRun && kind == Some(ActionKind::AddReleaseRelatedWork);
        (debug, DebugScan::Idle)
    }
}

/// Where an action list sits, for error locations.
#[derive(Clone, Copy)]
enum Branch {
    Top,
    Then,
    Else,
}

impl Branch {
    fn segment(self, index: usize) -> String {
        match self {
            Branch::Top => format!("component {}", index),
            Branch::Then => format!("then[{}]", index),
            Branch::Else => format!("else[{}]", index),
        }
    }
}

/// Bidirectional mapping between rule specs and API component JSON.
#[derive(Debug, Clone)]
pub struct Codec {
    catalog: Catalog,
    aliases: AliasMap,
    context: BuildContext,
}

impl Codec {
    pub fn new(context: BuildContext, aliases: AliasMap) -> Self {
        Self {
            catalog: Catalog::new(),
            aliases,
            context,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    // =========================================================================
    // Trigger
    // =========================================================================

    pub fn build_trigger(&self, spec: &TriggerSpec, project_id: Option<&str>) -> Result<Value> {
        match spec {
            TriggerSpec::Structured { kind, args } => {
                let kind = self.catalog.trigger_by_name(kind)?;
                trigger::build_trigger(kind, args, &self.context.cloud_id, project_id)
            }
            TriggerSpec::Raw(json) => Ok(json.clone()),
        }
    }

    pub fn parse_trigger(&self, raw: &Value) -> Result<TriggerSpec> {
        let kind = self.catalog.trigger_by_type(type_tag(raw)?)?;
        let args = trigger::parse_trigger(kind, raw)?;
        Ok(TriggerSpec::structured(kind.name(), args))
    }

    // =========================================================================
    // Components: build
    // =========================================================================

    /// Build the ordered component list. Debug webhooks expand in place.
    pub fn build_components(&self, specs: &[ComponentSpec]) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let built = self
                .build_component(spec)
                .map_err(|e| e.at(Branch::Top.segment(index)))?;
            out.extend(built);
        }
        Ok(out)
    }

    fn build_component(&self, spec: &ComponentSpec) -> Result<Vec<Value>> {
        match spec {
            ComponentSpec::Action(action) => self.build_action(action),
            ComponentSpec::Condition(cond) => Ok(vec![self.build_condition(cond)?]),
            ComponentSpec::Raw(json) => Ok(vec![json.clone()]),
        }
    }

    /// One action, or four debug logs followed by the webhook.
    pub fn build_action(&self, spec: &ActionSpec) -> Result<Vec<Value>> {
        let kind = self.catalog.action_by_name(&spec.kind)?;
        let mut args = self.aliases.resolve(&spec.args);
        let cloud_id = &self.context.cloud_id;
        let webhook = self.context.webhook.as_ref();

        if action::wants_debug(kind, &args) {
            args.remove(DEBUG_ARG);
            let mut out = action::debug_logs(&args, cloud_id)?;
            out.push(action::build_action(kind, &args, cloud_id, webhook)?);
            return Ok(out);
        }
        Ok(vec![action::build_action(kind, &args, cloud_id, webhook)?])
    }

    pub fn build_condition(&self, spec: &ConditionSpec) -> Result<Value> {
        let then = self.build_branch(&spec.then, Branch::Then)?;
        let otherwise = self.build_branch(&spec.otherwise, Branch::Else)?;
        condition::build_condition(&self.aliases.resolve(&spec.args), then, otherwise)
    }

    fn build_branch(&self, actions: &[ActionSpec], branch: Branch) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let built = self
                .build_action(action)
                .map_err(|e| e.at(branch.segment(index)))?;
            out.extend(built);
        }
        Ok(out)
    }

    // =========================================================================
    // Components: parse
    // =========================================================================

    /// Parse the ordered component list. Runs of debug log entries are
    /// folded into the webhook that follows them.
    pub fn parse_components(&self, raws: &[Value]) -> Result<Vec<ComponentSpec>> {
        let mut out = Vec::with_capacity(raws.len());
        let mut scan = DebugScan::Idle;

        for (index, raw) in raws.iter().enumerate() {
            let located = |e: Error| e.at(Branch::Top.segment(index));
            if action::is_debug_log(raw) {
                scan = DebugScan::SawDebugRun;
                continue;
            }
            if condition::is_condition(raw) {
                let (_, next) = scan.settle(None);
                scan = next;
                out.push(ComponentSpec::Condition(
                    self.parse_condition(raw).map_err(located)?,
                ));
                continue;
            }
            let (kind, args) = self.parse_action_node(raw).map_err(located)?;
            let (debug, next) = scan.settle(Some(kind));
            scan = next;
            out.push(ComponentSpec::Action(self.finish_action(kind, args, debug)));
        }

        if scan == DebugScan::SawDebugRun {
            debug!("Dropping trailing debug log entries with no webhook after them");
        }
        Ok(out)
    }

    pub fn parse_condition(&self, raw: &Value) -> Result<ConditionSpec> {
        let parts = condition::split_condition(raw)?;
        Ok(ConditionSpec {
            args: self.aliases.unresolve(&parts.args),
            then: self.parse_branch(parts.then, Branch::Then)?,
            otherwise: self.parse_branch(parts.otherwise, Branch::Else)?,
        })
    }

    fn parse_branch(&self, raws: &[Value], branch: Branch) -> Result<Vec<ActionSpec>> {
        let mut out = Vec::with_capacity(raws.len());
        let mut scan = DebugScan::Idle;

        for (index, raw) in raws.iter().enumerate() {
            if action::is_debug_log(raw) {
                scan = DebugScan::SawDebugRun;
                continue;
            }
            let (kind, args) = self
                .parse_action_node(raw)
                .map_err(|e| e.at(branch.segment(index)))?;
            let (debug, next) = scan.settle(Some(kind));
            scan = next;
            out.push(self.finish_action(kind, args, debug));
        }
        Ok(out)
    }

    fn parse_action_node(&self, raw: &Value) -> Result<(ActionKind, Args)> {
        let tag = type_tag(raw)?;
        if tag == CONDITION_CONTAINER_TYPE {
            return Err(Error::unrecognized("nested condition", tag));
        }
        let kind = self.catalog.action_by_type(tag)?;
        let args = action::parse_action(kind, raw, &self.catalog)?;
        Ok((kind, args))
    }

    fn finish_action(&self, kind: ActionKind, mut args: Args, debug: bool) -> ActionSpec {
        if debug {
            args.insert(DEBUG_ARG.to_string(), "true".to_string());
        }
        ActionSpec::new(kind.name(), self.aliases.unresolve(&args))
    }
}

fn type_tag(raw: &Value) -> Result<&str> {
    raw.get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed("component has no 'type' tag"))
}
