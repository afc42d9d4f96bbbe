//! Rule documents on disk: naming, export and loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{bail, Context};
use autorule_core::{RuleSpec, RuleView};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A rule spec plus the id of the rule it describes, if it exists already.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub spec: RuleSpec,
}

impl RuleDocument {
    /// Document that adopts an existing rule as-is. Labels are left out;
    /// the tool only ever adds them.
    pub fn from_view(view: &RuleView) -> Self {
        let mut spec = view.to_spec();
        spec.labels.clear();
        Self {
            id: Some(view.id.clone()),
            spec,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid rule file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Rule id from a Jira Automation URL ending in `#/rule/<uuid>`.
pub fn rule_id_from_url(url: &str) -> anyhow::Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"#/rule/([0-9a-f-]+)").expect("rule URL pattern is valid")
    });

    match pattern.captures(url).and_then(|c| c.get(1)) {
        Some(m) => Ok(m.as_str().to_string()),
        None => bail!("Could not extract rule UUID from URL: {}", url),
    }
}

/// File-name-safe identifier for a rule name.
pub fn sanitize(name: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let non_alnum =
        NON_ALNUM.get_or_init(|| Regex::new("[^a-z0-9]+").expect("sanitize pattern is valid"));

    let lower = name.to_lowercase();
    let replaced = non_alnum.replace_all(&lower, "_");
    let mut s = replaced.trim_matches('_').to_string();
    if s.is_empty() {
        s = "unnamed".to_string();
    }
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        s = format!("r_{}", s);
    }
    s
}

/// Hands out unique names: the second `foo` becomes `foo_2`, and so on.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashMap<String, usize>,
}

impl NameAllocator {
    pub fn allocate(&mut self, base: &str) -> String {
        let count = self.used.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{}_{}", base, count)
        }
    }
}

pub fn document_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("rule_{}.json", name))
}
