//! Field alias resolution.
//!
//! Aliases let users write `{{issue.release_version}}` instead of
//! `{{issue.customfield_10709}}`. Resolution is a literal substitution limited
//! to the `{{issue.` and `{{triggerIssue.` smart-value prefixes, plus a
//! whole-value match for bare field arguments.

use std::collections::BTreeMap;

use autorule_core::Args;
use tracing::warn;

const SMART_VALUE_PREFIXES: &[&str] = &["{{issue.", "{{triggerIssue."];

/// Bidirectional alias table: friendly name ↔ field id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    to_id: BTreeMap<String, String>,
    to_alias: BTreeMap<String, String>,
}

impl AliasMap {
    /// Build from alias → field id pairs.
    ///
    /// When several aliases name the same field, the first one in sorted
    /// order is used when reading back.
    pub fn new(aliases: impl IntoIterator<Item = (String, String)>) -> Self {
        let to_id: BTreeMap<String, String> = aliases.into_iter().collect();
        let mut to_alias = BTreeMap::new();
        for (alias, field_id) in &to_id {
            if let Some(existing) = to_alias.get(field_id) {
                warn!(
                    field_id = field_id.as_str(),
                    kept = ?existing,
                    ignored = alias.as_str(),
                    "Several aliases map to one field id"
                );
                continue;
            }
            to_alias.insert(field_id.clone(), alias.clone());
        }
        Self { to_id, to_alias }
    }

    pub fn is_empty(&self) -> bool {
        self.to_id.is_empty()
    }

    /// Alias → field id table.
    pub fn forward(&self) -> &BTreeMap<String, String> {
        &self.to_id
    }

    /// Field id → alias table.
    pub fn reverse(&self) -> &BTreeMap<String, String> {
        &self.to_alias
    }

    /// Outbound: aliases → field ids.
    pub fn resolve(&self, args: &Args) -> Args {
        resolve(args, &self.to_id)
    }

    /// Inbound: field ids → aliases.
    pub fn unresolve(&self, args: &Args) -> Args {
        unresolve(args, &self.to_alias)
    }
}

/// Replace aliases with field ids in every value of `args`.
pub fn resolve(args: &Args, alias_to_id: &BTreeMap<String, String>) -> Args {
    substitute(args, alias_to_id)
}

/// Replace field ids with aliases in every value of `args`.
pub fn unresolve(args: &Args, id_to_alias: &BTreeMap<String, String>) -> Args {
    substitute(args, id_to_alias)
}

fn substitute(args: &Args, table: &BTreeMap<String, String>) -> Args {
    if table.is_empty() {
        return args.clone();
    }

    // Longest names first so a short name never matches inside a longer one.
    let mut names: Vec<&String> = table.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    args.iter()
        .map(|(key, value)| {
            let mut resolved = value.clone();
            for name in &names {
                resolved = replace_smart_value_field(&resolved, name, &table[*name]);
            }
            if let Some(target) = table.get(&resolved) {
                resolved = target.clone();
            }
            (key.clone(), resolved)
        })
        .collect()
}

/// Rewrite `{{issue.<old>` and `{{triggerIssue.<old>` to use `new`.
fn replace_smart_value_field(s: &str, old_field: &str, new_field: &str) -> String {
    let mut out = s.to_string();
    for prefix in SMART_VALUE_PREFIXES {
        let old = format!("{}{}", prefix, old_field);
        if out.contains(&old) {
            out = out.replace(&old, &format!("{}{}", prefix, new_field));
        }
    }
    out
}
