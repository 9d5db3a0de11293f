use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    AuditEvent, AuditKind, BankId, ExceptionAction, OverlayAction, PolicyException, PolicyOverlay,
    ValidationResult,
};
use crate::observability::MetricsRegistry;
use crate::store::{AuditSink, PolicyStore};

/// Applies a bank's policy overlay and exceptions to a verdict.
///
/// Strictly additive risk-reduction tooling: every failure path returns
/// the original, untransformed result. Policy application can never make
/// validation itself fail, and audit-write failures never block the
/// caller from receiving a verdict.
pub struct PolicyWriter {
    policies: Arc<dyn PolicyStore>,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<MetricsRegistry>,
}

impl PolicyWriter {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        audit: Arc<dyn AuditSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        PolicyWriter {
            policies,
            audit,
            metrics,
        }
    }

    /// Produce a transformed copy of the result under the bank's policy.
    ///
    /// The input is never mutated. A bank with no overlay and no
    /// exceptions gets back a result equal to the input.
    pub async fn apply_bank_policy(
        &self,
        result: &ValidationResult,
        bank_id: &BankId,
    ) -> ValidationResult {
        let overlay = match self.policies.get_active_overlay(bank_id).await {
            Ok(overlay) => overlay,
            Err(e) => {
                warn!(bank = %bank_id, error = %e, "overlay fetch failed, returning original verdict");
                return result.clone();
            }
        };

        let exceptions = match self.policies.get_active_exceptions(bank_id).await {
            Ok(exceptions) => exceptions,
            Err(e) => {
                warn!(bank = %bank_id, error = %e, "exception fetch failed, returning original verdict");
                return result.clone();
            }
        };

        if overlay.is_none() && exceptions.is_empty() {
            return result.clone();
        }

        let (transformed, events) = transform(result, bank_id, overlay.as_ref(), &exceptions);

        if !events.is_empty() {
            // Audit failures are swallowed; the batch is atomic so a
            // failure leaves no partial trail behind.
            if let Err(e) = self.audit.write_audit_batch(&events).await {
                self.metrics.record_audit_write_error();
                warn!(bank = %bank_id, error = %e, "audit write failed, verdict unaffected");
            } else {
                info!(bank = %bank_id, events = events.len(), "policy transformations audited");
            }
        }

        transformed
    }
}

/// Apply overlay actions, then exceptions, to a copy of the verdict.
///
/// Exceptions run strictly after overlays and override them: an
/// exception that sets a severity resurrects an issue the overlay had
/// suppressed.
fn transform(
    result: &ValidationResult,
    bank_id: &BankId,
    overlay: Option<&PolicyOverlay>,
    exceptions: &[PolicyException],
) -> (ValidationResult, Vec<AuditEvent>) {
    let mut events = Vec::new();

    // Suppression is a mark, not a removal, so later exceptions can
    // still target the issue.
    let mut issues: Vec<(crate::domain::Issue, bool)> =
        result.issues.iter().map(|i| (i.clone(), false)).collect();

    if let Some(overlay) = overlay {
        for action in &overlay.actions {
            for (issue, suppressed) in issues.iter_mut().filter(|(_, s)| !*s) {
                match action {
                    OverlayAction::SuppressSeverity { severity } if issue.severity == *severity => {
                        *suppressed = true;
                        events.push(AuditEvent::new(
                            bank_id.clone(),
                            result.result_id,
                            issue.rule_key.clone(),
                            AuditKind::SeveritySuppressed,
                            issue.severity,
                            None,
                        ));
                    }
                    OverlayAction::Reclassify { from, to } if issue.severity == *from => {
                        events.push(AuditEvent::new(
                            bank_id.clone(),
                            result.result_id,
                            issue.rule_key.clone(),
                            AuditKind::SeverityReclassified,
                            *from,
                            Some(*to),
                        ));
                        issue.severity = *to;
                    }
                    OverlayAction::SuppressRule { rule_key } if issue.rule_key == *rule_key => {
                        *suppressed = true;
                        events.push(AuditEvent::new(
                            bank_id.clone(),
                            result.result_id,
                            issue.rule_key.clone(),
                            AuditKind::RuleSuppressed,
                            issue.severity,
                            None,
                        ));
                    }
                    _ => {}
                }
            }
        }
    }

    let now = chrono::Utc::now();
    for exception in exceptions.iter().filter(|e| e.is_active(now)) {
        for (issue, suppressed) in issues.iter_mut() {
            if issue.rule_key != exception.rule_key {
                continue;
            }
            match &exception.action {
                ExceptionAction::Suppress => {
                    if !*suppressed {
                        *suppressed = true;
                        events.push(AuditEvent::new(
                            bank_id.clone(),
                            result.result_id,
                            issue.rule_key.clone(),
                            AuditKind::ExceptionApplied,
                            issue.severity,
                            None,
                        ));
                    }
                }
                ExceptionAction::SetSeverity { severity } => {
                    let before = issue.severity;
                    issue.severity = *severity;
                    *suppressed = false;
                    events.push(AuditEvent::new(
                        bank_id.clone(),
                        result.result_id,
                        issue.rule_key.clone(),
                        AuditKind::ExceptionApplied,
                        before,
                        Some(*severity),
                    ));
                }
            }
        }
    }

    let surviving: Vec<_> = issues
        .into_iter()
        .filter(|(_, suppressed)| !*suppressed)
        .map(|(issue, _)| issue)
        .collect();

    let mut transformed = result.clone();
    transformed.summary.by_severity = count_by_severity(&surviving);
    transformed.summary.by_document = count_by_document(&surviving);
    transformed.issues = surviving;
    transformed.overlay_version = overlay.map(|o| o.version.clone());

    (transformed, events)
}

fn count_by_severity(issues: &[crate::domain::Issue]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.severity.to_string()).or_insert(0) += 1;
    }
    counts
}

fn count_by_document(issues: &[crate::domain::Issue]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        let key = issue
            .doc_ref
            .as_ref()
            .map(|d| d.as_str().to_string())
            .unwrap_or_default();
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}
