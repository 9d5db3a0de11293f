use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{ProvenanceEntry, ValidationResult, VerdictSummary};

use super::executor::ExecutionOutcome;

/// Assemble the final verdict from executor output and loader provenance.
///
/// Pure reshaping: no rule logic, no I/O, order-preserving. Identical
/// inputs produce byte-identical results, which regression and audit
/// tooling rely on; the result id is supplied by the caller for exactly
/// that reason.
pub fn build_verdict(
    result_id: Uuid,
    lc_number: &str,
    execution: ExecutionOutcome,
    provenance: Vec<ProvenanceEntry>,
) -> ValidationResult {
    let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_document: BTreeMap<String, usize> = BTreeMap::new();

    for issue in &execution.issues {
        *by_severity.entry(issue.severity.to_string()).or_insert(0) += 1;

        let doc_key = issue
            .doc_ref
            .as_ref()
            .map(|d| d.as_str().to_string())
            .unwrap_or_default();
        *by_document.entry(doc_key).or_insert(0) += 1;
    }

    let rules_loaded = provenance.iter().map(|p| p.rule_count).sum();
    let rules_skipped = execution.skipped.len();

    ValidationResult {
        result_id,
        lc_number: lc_number.to_string(),
        issues: execution.issues,
        skipped: execution.skipped,
        provenance,
        summary: VerdictSummary {
            by_severity,
            by_document,
            rules_loaded,
            rules_evaluated: execution.rules_evaluated,
            rules_skipped,
        },
        overlay_version: None,
    }
}
