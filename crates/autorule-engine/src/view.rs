//! Turning a fetched rule into a [`RuleView`].

use autorule_codec::{canonical_value, Codec};
use autorule_core::{ComponentSpec, RemoteRule, Result, RuleSpec, RuleView, TriggerSpec};

/// Which parts of a rule are read back structured.
///
/// Parts the caller declared as raw JSON are read back raw (canonical
/// form), so a raw declaration never drifts into a structured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Representation {
    pub structured_trigger: bool,
    pub structured_components: bool,
}

impl Representation {
    pub const STRUCTURED: Representation = Representation {
        structured_trigger: true,
        structured_components: true,
    };

    pub const RAW: Representation = Representation {
        structured_trigger: false,
        structured_components: false,
    };

    /// The representation a spec was written in.
    pub fn of(spec: &RuleSpec) -> Self {
        Self {
            structured_trigger: !spec.trigger.is_raw(),
            structured_components: !spec.has_raw_components(),
        }
    }
}

pub fn to_view(codec: &Codec, remote: &RemoteRule, repr: Representation) -> Result<RuleView> {
    let trigger = if repr.structured_trigger {
        codec.parse_trigger(&remote.trigger)?
    } else {
        TriggerSpec::Raw(canonical_value(&remote.trigger))
    };

    let components = if repr.structured_components {
        codec.parse_components(&remote.components)?
    } else {
        remote
            .components
            .iter()
            .map(|c| ComponentSpec::Raw(canonical_value(c)))
            .collect()
    };

    Ok(RuleView {
        id: remote.uuid.clone(),
        name: remote.name.clone(),
        enabled: remote.is_enabled(),
        state: remote.state.clone(),
        scope: remote.rule_scope_aris.clone(),
        labels: remote.labels.clone(),
        trigger,
        components,
    })
}
