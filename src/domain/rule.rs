use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::{DocumentData, DocumentType, FieldValue, LcType};
use super::Severity;

/// Identifier of a rule family (a compliance framework or supplement).
///
/// Domains form an ordered sequence per validation: position 0 is the
/// primary, everything after is supplemental.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleDomain(String);

impl RuleDomain {
    /// Create a domain identifier, normalized to uppercase.
    pub fn new(id: impl Into<String>) -> Self {
        RuleDomain(id.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UCP 600 — documentary credits.
    pub fn ucp600() -> Self {
        RuleDomain("UCP600".to_string())
    }

    /// eUCP — electronic presentation supplement to UCP.
    pub fn eucp() -> Self {
        RuleDomain("EUCP".to_string())
    }

    /// ISP98 — standby letters of credit.
    pub fn isp98() -> Self {
        RuleDomain("ISP98".to_string())
    }

    /// URC 522 — collections.
    pub fn urc522() -> Self {
        RuleDomain("URC522".to_string())
    }

    /// ISBP 821 — examination-practice supplement.
    pub fn isbp821() -> Self {
        RuleDomain("ISBP821".to_string())
    }

    /// Sanctions-clause screening supplement.
    pub fn sanctions() -> Self {
        RuleDomain("SANCTIONS".to_string())
    }

    /// Cross-document consolidation domain, appended when multiple
    /// variants of one family are active.
    pub fn cross_doc() -> Self {
        RuleDomain("CROSS_DOC".to_string())
    }

    /// The rule family this domain is a variant of.
    ///
    /// UCP600 and EUCP are both variants of the UCP family; a resolved
    /// sequence containing two variants of one family triggers the
    /// CROSS_DOC consolidation domain.
    pub fn family(&self) -> &str {
        match self.0.as_str() {
            "UCP600" | "EUCP" => "UCP",
            "ISP98" => "ISP",
            "URC522" => "URC",
            "ISBP821" => "ISBP",
            other => other,
        }
    }
}

impl fmt::Display for RuleDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique rule identifier, e.g. "UCP600-14A-INVOICE-VALUE".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleKey(pub String);

impl RuleKey {
    pub fn new(key: impl Into<String>) -> Self {
        RuleKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Comparison operator for literal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Field must be present (value operand ignored)
    Present,
    /// Field must be absent (value operand ignored)
    Absent,
}

/// Applicability predicate: all non-empty filters must match, plus the
/// feature toggle if one is named.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Applicability {
    /// Document types this rule targets; empty means any
    #[serde(default)]
    pub doc_types: Vec<DocumentType>,

    /// LC types this rule targets; empty means any
    #[serde(default)]
    pub lc_types: Vec<LcType>,

    /// Jurisdictions (ISO codes) this rule targets; empty means any
    #[serde(default)]
    pub jurisdictions: Vec<String>,

    /// Feature toggle that must be enabled for the rule to run
    #[serde(default)]
    pub feature: Option<String>,
}

impl Applicability {
    /// Check this rule against the current document context.
    ///
    /// A rule targeting a document type is not applicable when no
    /// document of that type was supplied; that is expected, not an
    /// error.
    pub fn applies(&self, data: &DocumentData, enabled_features: &[String]) -> bool {
        if let Some(feature) = &self.feature {
            if !enabled_features.iter().any(|f| f == feature) {
                return false;
            }
        }

        if !self.lc_types.is_empty() && !self.lc_types.contains(&data.lc.lc_type) {
            return false;
        }

        if !self.jurisdictions.is_empty() {
            let j = data.lc.jurisdiction.as_str();
            if !self.jurisdictions.iter().any(|x| x.eq_ignore_ascii_case(j)) {
                return false;
            }
        }

        if !self.doc_types.is_empty()
            && !self.doc_types.iter().any(|t| data.has_document(t))
        {
            return false;
        }

        true
    }
}

/// A semantic check: a condition that expands into one or more concrete
/// comparisons over derived or cross-document values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum SemanticCheck {
    /// A named field must carry the same value on every listed document
    /// type that supplies it. For dates, values within `tolerance_days`
    /// of the first-seen value are treated as consistent.
    FieldsConsistent {
        field: String,
        doc_types: Vec<DocumentType>,
        #[serde(default)]
        tolerance_days: i64,
    },

    /// A date field on a document must not fall after the LC expiry.
    WithinLcExpiry {
        doc_type: DocumentType,
        field: String,
    },

    /// An amount field must not exceed the LC amount by more than the
    /// tolerance percentage (UCP 600 art. 30 "about" tolerance).
    AmountTolerance {
        doc_type: DocumentType,
        field: String,
        tolerance_pct: Decimal,
    },
}

/// Rule condition: a literal single-field comparison, or a semantic check
/// expanded at evaluation time. Single dispatch point in the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    Literal {
        doc_type: DocumentType,
        field: String,
        op: ComparisonOp,
        #[serde(default)]
        value: Option<FieldValue>,
    },
    Semantic(SemanticCheck),
}

/// One validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule key
    pub key: RuleKey,

    /// Applicability predicate
    #[serde(default)]
    pub applicability: Applicability,

    /// Violation condition
    pub condition: RuleCondition,

    /// Severity of the issue when the rule is violated
    pub severity: Severity,

    /// Human-readable description of the requirement
    pub message: String,

    /// Remediation suggestion attached to emitted issues
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// Ordered collection of rules for one domain, with a version fingerprint
/// used for provenance. Immutable once loaded for a given evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// The domain these rules belong to
    pub domain: RuleDomain,

    /// Version fingerprint (recorded in provenance)
    pub version: String,

    /// Rules in evaluation order
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn empty(domain: RuleDomain) -> Self {
        RuleSet {
            domain,
            version: "0.0.0".to_string(),
            rules: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{Document, Jurisdiction, LcInfo};
    use chrono::NaiveDate;

    fn test_data(lc_type: LcType, docs: Vec<Document>) -> DocumentData {
        DocumentData {
            lc: LcInfo {
                lc_number: "LC-1".to_string(),
                lc_type,
                declared_standard: None,
                jurisdiction: Jurisdiction::new("SG"),
                currency: "USD".to_string(),
                amount: Decimal::new(50_000, 0),
                issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                expiry_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                clauses: vec![],
            },
            documents: docs,
        }
    }

    #[test]
    fn test_domain_normalization_and_family() {
        assert_eq!(RuleDomain::new("ucp600"), RuleDomain::ucp600());
        assert_eq!(RuleDomain::ucp600().family(), "UCP");
        assert_eq!(RuleDomain::eucp().family(), "UCP");
        assert_eq!(RuleDomain::isp98().family(), "ISP");
        assert_eq!(RuleDomain::sanctions().family(), "SANCTIONS");
    }

    #[test]
    fn test_applicability_doc_type_present() {
        let applicability = Applicability {
            doc_types: vec![DocumentType::CommercialInvoice],
            ..Default::default()
        };

        let with_invoice = test_data(
            LcType::Sight,
            vec![Document::new("INV-1", DocumentType::CommercialInvoice)],
        );
        assert!(applicability.applies(&with_invoice, &[]));

        let without = test_data(LcType::Sight, vec![]);
        assert!(!applicability.applies(&without, &[]));
    }

    #[test]
    fn test_applicability_feature_toggle() {
        let applicability = Applicability {
            feature: Some("strict_origin_checks".to_string()),
            ..Default::default()
        };
        let data = test_data(LcType::Sight, vec![]);

        assert!(!applicability.applies(&data, &[]));
        assert!(applicability.applies(&data, &["strict_origin_checks".to_string()]));
    }

    #[test]
    fn test_applicability_lc_type_and_jurisdiction() {
        let applicability = Applicability {
            lc_types: vec![LcType::Standby],
            jurisdictions: vec!["sg".to_string()],
            ..Default::default()
        };

        let standby = test_data(LcType::Standby, vec![]);
        assert!(applicability.applies(&standby, &[]));

        let sight = test_data(LcType::Sight, vec![]);
        assert!(!applicability.applies(&sight, &[]));
    }

    #[test]
    fn test_ruleset_yaml_deserialization() {
        let yaml = r#"
domain: UCP600
version: "2025-03.2"
rules:
  - key: UCP600-14A-INVOICE-PRESENT
    applicability:
      lc_types: [sight, usance]
    condition:
      type: literal
      doc_type: commercial_invoice
      field: invoice_number
      op: present
    severity: MAJOR
    message: "Commercial invoice must carry an invoice number"
  - key: UCP600-30-AMOUNT-TOLERANCE
    condition:
      type: semantic
      check: amount_tolerance
      doc_type: commercial_invoice
      field: total_amount
      tolerance_pct: 10
    severity: MAJOR
    message: "Invoice amount exceeds credit amount tolerance"
    suggestion: "Reissue invoice within the permitted tolerance"
"#;

        let ruleset: RuleSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(ruleset.domain, RuleDomain::ucp600());
        assert_eq!(ruleset.version, "2025-03.2");
        assert_eq!(ruleset.rules.len(), 2);
        assert_eq!(ruleset.rules[0].severity, Severity::Major);
        assert!(matches!(
            ruleset.rules[1].condition,
            RuleCondition::Semantic(SemanticCheck::AmountTolerance { .. })
        ));
    }
}
