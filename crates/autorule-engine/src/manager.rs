//! Rule lifecycle on top of a [`RuleApi`].

use autorule_codec::Codec;
use autorule_core::{
    CreateRuleRequest, Error, Outcome, Result, RuleApi, RuleSpec, RuleSummary, RuleView,
    UpdateRuleRequest, Warning,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::drift;
use crate::labels::{desired_labels, sync_labels};
use crate::view::{to_view, Representation};

/// Trigger and components built locally, ready to send.
struct BuiltRule {
    trigger: Value,
    components: Vec<Value>,
}

/// Manages automation rules: create, read, update, import and
/// destroy-by-disable.
pub struct RuleManager<A> {
    api: A,
    codec: Codec,
}

impl<A: RuleApi> RuleManager<A> {
    pub fn new(api: A, codec: Codec) -> Self {
        Self { api, codec }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    fn build(&self, spec: &RuleSpec) -> Result<BuiltRule> {
        let trigger = self
            .codec
            .build_trigger(&spec.trigger, spec.project_id.as_deref())
            .map_err(|e| e.at("trigger"))?;
        let components = self.codec.build_components(&spec.components)?;
        Ok(BuiltRule {
            trigger,
            components,
        })
    }

    /// All rules, summaries only.
    pub async fn list(&self) -> Result<Vec<RuleSummary>> {
        self.api.list_rules().await
    }

    /// Read a rule, parsing the parts `repr` asks for structured.
    pub async fn read(&self, id: &str, repr: Representation) -> Result<RuleView> {
        let remote = self.api.get_rule(id).await?;
        let mut view = to_view(&self.codec, &remote, repr)?;
        if view.id.is_empty() {
            view.id = id.to_string();
        }
        Ok(view)
    }

    /// Read a rule for adoption. Everything comes back raw, so unknown
    /// component types never block an import.
    pub async fn import(&self, id: &str) -> Result<RuleView> {
        self.read(id, Representation::RAW).await
    }

    /// Fields of `view` that differ from `spec`.
    pub fn diff(&self, spec: &RuleSpec, view: &RuleView) -> Result<Vec<&'static str>> {
        drift::diff(&self.codec, spec, view)
    }

    /// Create a rule and bring it to the desired state.
    ///
    /// Nothing is sent when the rule spec fails to build. Once the rule exists,
    /// any later failure is an [`Error::Incomplete`] carrying its id.
    pub async fn create(&self, spec: &RuleSpec) -> Result<Outcome<RuleView>> {
        let built = self.build(spec)?;

        let id = self
            .api
            .create_rule(CreateRuleRequest {
                name: spec.name.clone(),
                project_id: spec.project_id.clone(),
                trigger: built.trigger,
                components: built.components,
            })
            .await?;
        info!(rule_id = id, name = spec.name, "Rule created disabled");

        self.finish(&id, spec, &[]).await
    }

    /// Update an existing rule to match `spec`.
    pub async fn update(&self, id: &str, spec: &RuleSpec) -> Result<Outcome<RuleView>> {
        self.update_observed(id, spec, &[]).await
    }

    async fn update_observed(
        &self,
        id: &str,
        spec: &RuleSpec,
        observed_labels: &[String],
    ) -> Result<Outcome<RuleView>> {
        let built = self.build(spec)?;

        self.api
            .update_rule(
                id,
                UpdateRuleRequest {
                    name: spec.name.clone(),
                    trigger: built.trigger,
                    components: built.components,
                },
            )
            .await?;
        info!(rule_id = id, "Rule updated");

        self.finish(id, spec, observed_labels).await
    }

    /// State toggle, read-back and label sync shared by create and update.
    async fn finish(
        &self,
        id: &str,
        spec: &RuleSpec,
        observed_labels: &[String],
    ) -> Result<Outcome<RuleView>> {
        let incomplete = |step: &str, source: Error| Error::Incomplete {
            rule_id: id.to_string(),
            step: step.to_string(),
            source: Box::new(source),
        };
        let repr = Representation::of(spec);

        self.api
            .set_rule_state(id, spec.enabled)
            .await
            .map_err(|e| incomplete("set state", e))?;

        let view = self
            .read(id, repr)
            .await
            .map_err(|e| incomplete("read back", e))?;

        let (view, warnings) = self
            .sync(id, spec, view, observed_labels, repr)
            .await
            .map_err(|e| incomplete("read back after labelling", e))?;
        Ok(Outcome::with_warnings(view, warnings))
    }

    async fn sync(
        &self,
        id: &str,
        spec: &RuleSpec,
        view: RuleView,
        observed_labels: &[String],
        repr: Representation,
    ) -> Result<(RuleView, Vec<Warning>)> {
        let desired = desired_labels(&spec.labels, observed_labels);
        let project_id = match view.scope.as_slice() {
            [only] => autorule_core::project_id_from_scope(only).map(str::to_string),
            _ => None,
        };

        let synced = sync_labels(&self.api, id, project_id.as_deref(), &view.labels, &desired).await;
        for warning in &synced.warnings {
            warn!(rule_id = id, summary = warning.summary, "{}", warning.detail);
        }
        if synced.added.is_empty() {
            return Ok((view, synced.warnings));
        }

        let view = self.read(id, repr).await?;
        Ok((view, synced.warnings))
    }

    /// Create the rule when `existing` is `None`; otherwise update it if it
    /// drifted. Returns the current view either way.
    pub async fn apply(&self, existing: Option<&str>, spec: &RuleSpec) -> Result<Outcome<RuleView>> {
        let Some(id) = existing else {
            return self.create(spec).await;
        };

        // Fail on a bad spec before touching the remote rule.
        self.build(spec)?;

        let current = self.read(id, Representation::of(spec)).await?;
        let changed = self.diff(spec, &current)?;
        if changed.is_empty() {
            debug!(rule_id = id, "Rule up to date");
            return Ok(Outcome::new(current));
        }
        info!(rule_id = id, changed = ?changed, "Rule drifted");

        if changed == ["labels"] {
            let observed = current.labels.clone();
            let (view, warnings) = self
                .sync(id, spec, current, &observed, Representation::of(spec))
                .await?;
            return Ok(Outcome::with_warnings(view, warnings));
        }

        let observed = current.labels.clone();
        self.update_observed(id, spec, &observed).await
    }

    /// Destroy a rule by disabling it. The rule is never deleted.
    pub async fn destroy(&self, id: &str) -> Result<Outcome<()>> {
        self.api.set_rule_state(id, false).await?;
        info!(rule_id = id, "Rule disabled");

        Ok(Outcome::with_warnings(
            (),
            vec![Warning::new(
                "Rule disabled, not deleted",
                format!(
                    "Rule {} was disabled. The Automation API has no delete endpoint; delete it in the Jira UI if it is no longer needed.",
                    id
                ),
            )],
        ))
    }
}
