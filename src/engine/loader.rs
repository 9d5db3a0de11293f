use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    DocumentType, Jurisdiction, ProvenanceEntry, Rule, RuleDomain,
};
use crate::store::{RuleContext, RuleStore};

/// Errors that abort rule loading.
///
/// Only the primary domain can produce one: evaluating against an absent
/// primary rule set would silently yield a false clean verdict, so the
/// loader refuses to proceed instead.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("primary rule set for domain {domain} unavailable: {reason}")]
    PrimaryUnavailable { domain: RuleDomain, reason: String },

    #[error("no domains requested; a primary domain is required")]
    EmptyDomainSequence,
}

/// One rule paired with the domain that contributed it.
#[derive(Debug, Clone)]
pub struct LoadedRule {
    pub domain: RuleDomain,
    pub rule: Rule,
}

/// Context shared across the evaluation, recorded for the verdict.
#[derive(Debug, Clone)]
pub struct LoadMetadata {
    pub primary_domain: RuleDomain,
    pub jurisdiction: Jurisdiction,
    pub domains_requested: usize,
}

/// Output of the loading stage.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Rules from every domain that loaded, in domain order
    pub rules: Vec<LoadedRule>,

    pub metadata: LoadMetadata,

    /// Exactly one entry per requested domain, in request order
    pub provenance: Vec<ProvenanceEntry>,
}

/// Loads rule sets for a resolved domain sequence.
///
/// The primary domain is loaded fail-closed; supplements are best-effort
/// and their failures degrade coverage instead of blocking. Both paths
/// run through one parameterized fetch so the behaviors cannot drift.
pub struct RuleLoader {
    store: Arc<dyn RuleStore>,
    fetch_timeout: Duration,
}

impl RuleLoader {
    pub fn new(store: Arc<dyn RuleStore>, fetch_timeout: Duration) -> Self {
        RuleLoader {
            store,
            fetch_timeout,
        }
    }

    /// Load every domain in sequence order.
    ///
    /// Guarantees `provenance.len() == domains.len()` with matching order,
    /// and that `rules` only contains rules from loaded domains.
    pub async fn load(
        &self,
        domains: &[RuleDomain],
        jurisdiction: &Jurisdiction,
        document_type: &DocumentType,
    ) -> Result<LoadOutcome, LoadError> {
        let Some(primary_domain) = domains.first() else {
            return Err(LoadError::EmptyDomainSequence);
        };

        let mut rules = Vec::new();
        let mut provenance = Vec::with_capacity(domains.len());

        for (index, domain) in domains.iter().enumerate() {
            let strict = index == 0;
            let ctx = RuleContext::new(domain.clone(), jurisdiction.clone(), document_type.clone());

            match self.fetch_with_timeout(&ctx).await {
                Ok(Some(ruleset)) => {
                    info!(
                        domain = %domain,
                        version = %ruleset.version,
                        rules = ruleset.rules.len(),
                        "rule set loaded"
                    );
                    provenance.push(ProvenanceEntry::loaded(
                        domain.clone(),
                        ruleset.rules.len(),
                        ruleset.version.clone(),
                    ));
                    rules.extend(ruleset.rules.into_iter().map(|rule| LoadedRule {
                        domain: domain.clone(),
                        rule,
                    }));
                }
                Ok(None) => {
                    let reason = "rule set not found".to_string();
                    if strict {
                        return Err(LoadError::PrimaryUnavailable {
                            domain: domain.clone(),
                            reason,
                        });
                    }
                    warn!(domain = %domain, "supplemental rule set not found, continuing");
                    provenance.push(ProvenanceEntry::not_loaded(domain.clone(), reason));
                }
                Err(reason) => {
                    if strict {
                        return Err(LoadError::PrimaryUnavailable {
                            domain: domain.clone(),
                            reason,
                        });
                    }
                    warn!(domain = %domain, reason = %reason, "supplemental rule set fetch failed, continuing");
                    provenance.push(ProvenanceEntry::not_loaded(domain.clone(), reason));
                }
            }
        }

        Ok(LoadOutcome {
            rules,
            metadata: LoadMetadata {
                primary_domain: primary_domain.clone(),
                jurisdiction: jurisdiction.clone(),
                domains_requested: domains.len(),
            },
            provenance,
        })
    }

    /// Single fetch path used for both strict and best-effort domains.
    /// Timeouts are reported as fetch failures; strictness is decided by
    /// the caller, not here.
    async fn fetch_with_timeout(
        &self,
        ctx: &RuleContext,
    ) -> Result<Option<crate::domain::RuleSet>, String> {
        match tokio::time::timeout(self.fetch_timeout, self.store.fetch_rule_set(ctx)).await {
            Ok(Ok(ruleset)) => Ok(ruleset),
            Ok(Err(e)) => Err(format!("fetch error: {e}")),
            Err(_) => Err(format!(
                "fetch timed out after {}ms",
                self.fetch_timeout.as_millis()
            )),
        }
    }
}
