use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{RuleDomain, RuleSet};

use super::traits::{RuleContext, RuleStore};

/// Errors that can occur while loading fixture rule sets.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load one rule set from a YAML file.
pub fn load_rule_set(path: impl AsRef<Path>) -> Result<RuleSet, FixtureError> {
    let content = fs::read_to_string(path)?;
    let ruleset: RuleSet = serde_yaml::from_str(&content)?;

    validate_rule_set(&ruleset)?;

    Ok(ruleset)
}

/// Validate a loaded rule set.
fn validate_rule_set(ruleset: &RuleSet) -> Result<(), FixtureError> {
    if ruleset.version.is_empty() {
        return Err(FixtureError::Validation(
            "Rule set version cannot be empty".to_string(),
        ));
    }

    // Check for duplicate rule keys
    let mut seen = HashSet::new();
    for rule in &ruleset.rules {
        if !seen.insert(&rule.key) {
            return Err(FixtureError::Validation(format!(
                "Duplicate rule key: {}",
                rule.key
            )));
        }
    }

    Ok(())
}

/// File-backed rule store for local development and tests.
///
/// Each domain maps to one YAML file; files are loaded eagerly at
/// construction so a malformed fixture fails fast rather than surfacing
/// as a per-request fetch error.
#[derive(Debug)]
pub struct FixtureRuleStore {
    rule_sets: HashMap<RuleDomain, RuleSet>,
}

impl FixtureRuleStore {
    /// Load fixtures from `(domain, path)` pairs.
    pub fn load(paths: &[(RuleDomain, PathBuf)]) -> Result<Self, FixtureError> {
        let mut rule_sets = HashMap::new();

        for (domain, path) in paths {
            let ruleset = load_rule_set(path)?;
            if &ruleset.domain != domain {
                return Err(FixtureError::Validation(format!(
                    "Fixture {} declares domain {} but was registered as {}",
                    path.display(),
                    ruleset.domain,
                    domain
                )));
            }
            rule_sets.insert(domain.clone(), ruleset);
        }

        Ok(FixtureRuleStore { rule_sets })
    }

    /// Domains available in this store.
    pub fn domains(&self) -> impl Iterator<Item = &RuleDomain> {
        self.rule_sets.keys()
    }
}

#[async_trait]
impl RuleStore for FixtureRuleStore {
    async fn fetch_rule_set(&self, ctx: &RuleContext) -> anyhow::Result<Option<RuleSet>> {
        Ok(self.rule_sets.get(&ctx.domain).cloned())
    }
}
