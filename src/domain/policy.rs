use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::rule::RuleKey;
use super::Severity;

/// Bank (tenant) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BankId(pub String);

impl BankId {
    pub fn new(id: impl Into<String>) -> Self {
        BankId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One overlay transformation, applied over a verdict's issues in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OverlayAction {
    /// Drop every issue of the given severity
    SuppressSeverity { severity: Severity },

    /// Rewrite issues of one severity to another
    Reclassify { from: Severity, to: Severity },

    /// Drop issues emitted by one rule
    SuppressRule { rule_key: RuleKey },
}

/// Bank-scoped severity/suppression configuration.
///
/// Overlays are read from the policy store and applied to verdicts; the
/// engine never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOverlay {
    pub overlay_id: Uuid,
    pub bank_id: BankId,

    /// Version fingerprint, recorded on transformed verdicts
    pub version: String,

    /// Transformations in application order
    #[serde(default)]
    pub actions: Vec<OverlayAction>,
}

/// What an exception does to issues from its target rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExceptionAction {
    /// Drop the rule's issues entirely
    Suppress,

    /// Force the rule's issues to a fixed severity
    SetSeverity { severity: Severity },
}

/// Per-rule-per-bank override, applied strictly after (and overriding)
/// overlay effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyException {
    pub exception_id: Uuid,
    pub bank_id: BankId,
    pub rule_key: RuleKey,
    pub action: ExceptionAction,

    /// Expiry; exceptions past this instant are ignored
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PolicyException {
    /// True if the exception is active at the given instant.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now < expiry,
            None => true,
        }
    }
}

/// Kind of policy transformation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    SeveritySuppressed,
    SeverityReclassified,
    RuleSuppressed,
    ExceptionApplied,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::SeveritySuppressed => write!(f, "severity_suppressed"),
            AuditKind::SeverityReclassified => write!(f, "severity_reclassified"),
            AuditKind::RuleSuppressed => write!(f, "rule_suppressed"),
            AuditKind::ExceptionApplied => write!(f, "exception_applied"),
        }
    }
}

/// Record of one transformation a bank policy made to a verdict.
///
/// Audit events are append-only and independent of the verdict's own
/// lifecycle; a failed write never blocks the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub bank_id: BankId,

    /// The verdict that was transformed
    pub result_id: Uuid,

    /// Rule whose issue was affected
    pub rule_key: RuleKey,

    pub kind: AuditKind,

    /// Severity before the transformation
    pub before: Severity,

    /// Severity after the transformation; None when the issue was dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Severity>,

    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        bank_id: BankId,
        result_id: Uuid,
        rule_key: RuleKey,
        kind: AuditKind,
        before: Severity,
        after: Option<Severity>,
    ) -> Self {
        AuditEvent {
            event_id: Uuid::new_v4(),
            bank_id,
            result_id,
            rule_key,
            kind,
            before,
            after,
            recorded_at: Utc::now(),
        }
    }
}
