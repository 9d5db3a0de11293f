use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::issue::{Issue, RuleSkip};
use super::rule::RuleDomain;
use super::Severity;

/// Whether a domain's rule set loaded for this evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded,
    NotLoaded,
}

/// One entry per domain in the resolved sequence, in resolution order.
///
/// The provenance list is the engine's explanation of why these rules
/// ran; it is complete even when supplements failed to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub domain: RuleDomain,
    pub status: LoadStatus,

    /// Rules this domain contributed to the aggregated list
    pub rule_count: usize,

    /// Rule set version fingerprint, when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Failure reason, when not loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProvenanceEntry {
    pub fn loaded(domain: RuleDomain, rule_count: usize, version: impl Into<String>) -> Self {
        ProvenanceEntry {
            domain,
            status: LoadStatus::Loaded,
            rule_count,
            version: Some(version.into()),
            reason: None,
        }
    }

    pub fn not_loaded(domain: RuleDomain, reason: impl Into<String>) -> Self {
        ProvenanceEntry {
            domain,
            status: LoadStatus::NotLoaded,
            rule_count: 0,
            version: None,
            reason: Some(reason.into()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }
}

/// Aggregate counts over the issue list and rule evaluation.
///
/// BTreeMaps keep serialization deterministic, which the verdict builder
/// relies on for reproducible output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerdictSummary {
    /// Issue counts keyed by severity display name
    pub by_severity: BTreeMap<String, usize>,

    /// Issue counts keyed by document reference ("" for issues not
    /// attributable to a single document)
    pub by_document: BTreeMap<String, usize>,

    /// Rules contributed by loaded domains
    pub rules_loaded: usize,

    /// Rules that passed the applicability filter and were evaluated
    pub rules_evaluated: usize,

    /// Rules skipped due to evaluation errors
    pub rules_skipped: usize,
}

/// Final, immutable verdict for one validation request.
///
/// Never reused across requests; the policy writer produces a new result
/// rather than editing one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Request-scoped result identifier
    pub result_id: Uuid,

    /// LC number the verdict applies to
    pub lc_number: String,

    /// Violations in rule-evaluation order
    pub issues: Vec<Issue>,

    /// Rules skipped as unevaluable
    #[serde(default)]
    pub skipped: Vec<RuleSkip>,

    /// One entry per resolved domain, in resolution order
    pub provenance: Vec<ProvenanceEntry>,

    /// Aggregate counts
    pub summary: VerdictSummary,

    /// Version of the bank policy overlay applied, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_version: Option<String>,
}

impl ValidationResult {
    /// True when no issues were found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Most severe issue severity, if any issues exist.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    /// Domains whose rule sets did not load (reduced coverage).
    pub fn degraded_domains(&self) -> impl Iterator<Item = &ProvenanceEntry> {
        self.provenance.iter().filter(|p| !p.is_loaded())
    }
}
