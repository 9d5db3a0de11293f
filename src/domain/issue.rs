use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::document::DocRef;
use super::rule::{RuleDomain, RuleKey};
use super::Severity;

/// One field-level mismatch found while expanding a semantic check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDifference {
    /// Document the mismatching value came from
    pub doc_ref: DocRef,

    /// Field name on that document
    pub field: String,

    /// Value the check expected (display form)
    pub expected: String,

    /// Value actually found (display form)
    pub actual: String,
}

impl FieldDifference {
    pub fn new(
        doc_ref: DocRef,
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        FieldDifference {
            doc_ref,
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// One rule violation instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// The rule that was violated
    pub rule_key: RuleKey,

    /// The domain that contributed the rule
    pub domain: RuleDomain,

    /// Severity, as configured on the rule (may be rewritten by a bank
    /// policy overlay downstream)
    pub severity: Severity,

    /// Document the violation was found on, when attributable to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_ref: Option<DocRef>,

    /// Expected value (display form)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value (display form)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    /// Field-level differences for semantic rules; empty for literal rules
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub differences: SmallVec<[FieldDifference; 2]>,

    /// The rule's requirement description
    pub message: String,

    /// Remediation suggestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Issue {
    /// Issue from a literal comparison failure on one document.
    pub fn literal(
        rule_key: RuleKey,
        domain: RuleDomain,
        severity: Severity,
        doc_ref: DocRef,
        expected: impl Into<String>,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Issue {
            rule_key,
            domain,
            severity,
            doc_ref: Some(doc_ref),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            differences: SmallVec::new(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Issue from a semantic check carrying its expanded differences.
    pub fn semantic(
        rule_key: RuleKey,
        domain: RuleDomain,
        severity: Severity,
        expected: impl Into<String>,
        actual: impl Into<String>,
        differences: SmallVec<[FieldDifference; 2]>,
        message: impl Into<String>,
    ) -> Self {
        Issue {
            rule_key,
            domain,
            severity,
            doc_ref: differences.first().map(|d| d.doc_ref.clone()),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            differences,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

/// Record of a rule that could not be evaluated and was skipped.
///
/// Skips never abort a batch; they ride along on the verdict so reduced
/// coverage stays visible to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSkip {
    pub rule_key: RuleKey,
    pub domain: RuleDomain,
    pub reason: String,
}

impl RuleSkip {
    pub fn new(rule_key: RuleKey, domain: RuleDomain, reason: impl Into<String>) -> Self {
        RuleSkip {
            rule_key,
            domain,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_literal_issue() {
        let issue = Issue::literal(
            RuleKey::new("UCP600-14A"),
            RuleDomain::ucp600(),
            Severity::Major,
            DocRef::new("INV-1"),
            "USD",
            "EUR",
            "Invoice currency must match the credit",
        );

        assert_eq!(issue.doc_ref, Some(DocRef::new("INV-1")));
        assert_eq!(issue.expected.as_deref(), Some("USD"));
        assert!(issue.differences.is_empty());
    }

    #[test]
    fn test_semantic_issue_doc_ref_from_first_difference() {
        let differences: SmallVec<[FieldDifference; 2]> = smallvec![
            FieldDifference::new(DocRef::new("BL-1"), "shipment_date", "2025-02-01", "2025-02-04"),
        ];

        let issue = Issue::semantic(
            RuleKey::new("CROSS-DATES"),
            RuleDomain::cross_doc(),
            Severity::Minor,
            "2025-02-01",
            "2025-02-04",
            differences,
            "Shipment dates must be consistent",
        );

        assert_eq!(issue.doc_ref, Some(DocRef::new("BL-1")));
        assert_eq!(issue.differences.len(), 1);
    }

    #[test]
    fn test_issue_serialization_omits_empty_fields() {
        let issue = Issue::literal(
            RuleKey::new("K"),
            RuleDomain::ucp600(),
            Severity::Minor,
            DocRef::new("D"),
            "a",
            "b",
            "m",
        );
        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("differences"));
        assert!(!json.contains("suggestion"));
    }
}
