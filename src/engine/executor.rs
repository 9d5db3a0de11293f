use rust_decimal::Decimal;
use smallvec::SmallVec;
use tracing::debug;

use crate::domain::{
    ComparisonOp, DocumentData, DocumentType, FieldDifference, FieldValue, Issue, Rule,
    RuleCondition, RuleSkip, SemanticCheck,
};

use super::loader::LoadedRule;

/// Output of the execution stage.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    /// Issues in rule-evaluation order
    pub issues: Vec<Issue>,

    /// Rules that could not be evaluated
    pub skipped: Vec<RuleSkip>,

    /// Rules that passed the applicability filter
    pub rules_evaluated: usize,
}

/// Evaluate aggregated rules against document data.
///
/// Pure computation: no I/O, no suspension. Evaluation follows the
/// aggregated order, so primary-domain rules run before supplements and
/// issue order is deterministic. A rule whose condition cannot be
/// evaluated is skipped and recorded; it never aborts the batch.
pub fn execute_rules(
    rules: &[LoadedRule],
    data: &DocumentData,
    enabled_features: &[String],
) -> ExecutionOutcome {
    let mut outcome = ExecutionOutcome::default();

    for loaded in rules {
        let rule = &loaded.rule;

        // Non-applicable rules are expected and skipped silently.
        if !rule.applicability.applies(data, enabled_features) {
            continue;
        }

        outcome.rules_evaluated += 1;

        match evaluate_condition(rule, data) {
            Ok(issues) => {
                for issue in issues {
                    outcome.issues.push(
                        Issue {
                            domain: loaded.domain.clone(),
                            ..issue
                        }
                        .with_suggestion(rule.suggestion.clone()),
                    );
                }
            }
            Err(reason) => {
                debug!(rule = %rule.key, reason = %reason, "rule skipped");
                outcome.skipped.push(RuleSkip::new(
                    rule.key.clone(),
                    loaded.domain.clone(),
                    reason,
                ));
            }
        }
    }

    outcome
}

/// Single dispatch point over the condition variants.
fn evaluate_condition(rule: &Rule, data: &DocumentData) -> Result<Vec<Issue>, String> {
    match &rule.condition {
        RuleCondition::Literal {
            doc_type,
            field,
            op,
            value,
        } => evaluate_literal(rule, data, doc_type, field, *op, value.as_ref()),
        RuleCondition::Semantic(check) => {
            Ok(evaluate_semantic(rule, data, check)?.into_iter().collect())
        }
    }
}

/// Evaluate a literal comparison against every document of the target
/// type, emitting one issue per violating document.
fn evaluate_literal(
    rule: &Rule,
    data: &DocumentData,
    doc_type: &DocumentType,
    field: &str,
    op: ComparisonOp,
    operand: Option<&FieldValue>,
) -> Result<Vec<Issue>, String> {
    let mut issues = Vec::new();

    for doc in data.documents_of_type(doc_type) {
        let found = doc.field(field);

        match op {
            ComparisonOp::Present => {
                if found.is_none() {
                    issues.push(Issue::literal(
                        rule.key.clone(),
                        crate::domain::RuleDomain::new(""),
                        rule.severity,
                        doc.doc_ref.clone(),
                        format!("{field} present"),
                        "absent",
                        rule.message.clone(),
                    ));
                }
            }
            ComparisonOp::Absent => {
                if let Some(value) = found {
                    issues.push(Issue::literal(
                        rule.key.clone(),
                        crate::domain::RuleDomain::new(""),
                        rule.severity,
                        doc.doc_ref.clone(),
                        format!("{field} absent"),
                        value.render(),
                        rule.message.clone(),
                    ));
                }
            }
            _ => {
                let operand = operand
                    .ok_or_else(|| format!("comparison {op:?} on {field} has no operand"))?;
                let Some(actual) = found else {
                    return Err(format!("field {field} not found on {}", doc.doc_ref));
                };
                let ordering = actual.partial_cmp_value(operand).ok_or_else(|| {
                    format!("field {field} on {} is not comparable to the rule operand", doc.doc_ref)
                })?;

                let satisfied = match op {
                    ComparisonOp::Eq => ordering == std::cmp::Ordering::Equal,
                    ComparisonOp::Ne => ordering != std::cmp::Ordering::Equal,
                    ComparisonOp::Lt => ordering == std::cmp::Ordering::Less,
                    ComparisonOp::Lte => ordering != std::cmp::Ordering::Greater,
                    ComparisonOp::Gt => ordering == std::cmp::Ordering::Greater,
                    ComparisonOp::Gte => ordering != std::cmp::Ordering::Less,
                    ComparisonOp::Present | ComparisonOp::Absent => unreachable!(),
                };

                if !satisfied {
                    issues.push(Issue::literal(
                        rule.key.clone(),
                        crate::domain::RuleDomain::new(""),
                        rule.severity,
                        doc.doc_ref.clone(),
                        operand.render(),
                        actual.render(),
                        rule.message.clone(),
                    ));
                }
            }
        }
    }

    Ok(issues)
}

/// Expand a semantic check into concrete comparisons. A violated check
/// emits one issue carrying the full field-level difference list.
fn evaluate_semantic(
    rule: &Rule,
    data: &DocumentData,
    check: &SemanticCheck,
) -> Result<Option<Issue>, String> {
    let differences = expand_check(data, check)?;

    if differences.is_empty() {
        return Ok(None);
    }

    let expected = differences[0].expected.clone();
    let actual = differences[0].actual.clone();

    Ok(Some(Issue::semantic(
        rule.key.clone(),
        crate::domain::RuleDomain::new(""),
        rule.severity,
        expected,
        actual,
        differences,
        rule.message.clone(),
    )))
}

fn expand_check(
    data: &DocumentData,
    check: &SemanticCheck,
) -> Result<SmallVec<[FieldDifference; 2]>, String> {
    let mut differences = SmallVec::new();

    match check {
        SemanticCheck::FieldsConsistent {
            field,
            doc_types,
            tolerance_days,
        } => {
            // Gather the field from every targeted document that carries it.
            let mut values = Vec::new();
            for doc_type in doc_types {
                for doc in data.documents_of_type(doc_type) {
                    if let Some(value) = doc.field(field) {
                        values.push((doc.doc_ref.clone(), value));
                    }
                }
            }

            // Nothing to cross-check with fewer than two carriers.
            let Some((_, reference)) = values.first() else {
                return Ok(differences);
            };
            let reference = *reference;

            for (doc_ref, value) in values.iter().skip(1) {
                let consistent = match (reference, value) {
                    (FieldValue::Date(a), FieldValue::Date(b)) => {
                        (*b - *a).num_days().abs() <= *tolerance_days
                    }
                    _ => {
                        reference.partial_cmp_value(value).ok_or_else(|| {
                            format!("field {field} has mixed types across documents")
                        })? == std::cmp::Ordering::Equal
                    }
                };

                if !consistent {
                    differences.push(FieldDifference::new(
                        doc_ref.clone(),
                        field.clone(),
                        reference.render(),
                        value.render(),
                    ));
                }
            }
        }

        SemanticCheck::WithinLcExpiry { doc_type, field } => {
            for doc in data.documents_of_type(doc_type) {
                let Some(value) = doc.field(field) else {
                    return Err(format!("field {field} not found on {}", doc.doc_ref));
                };
                let FieldValue::Date(date) = value else {
                    return Err(format!("field {field} on {} is not a date", doc.doc_ref));
                };

                if *date > data.lc.expiry_date {
                    differences.push(FieldDifference::new(
                        doc.doc_ref.clone(),
                        field.clone(),
                        format!("on or before {}", data.lc.expiry_date),
                        date.to_string(),
                    ));
                }
            }
        }

        SemanticCheck::AmountTolerance {
            doc_type,
            field,
            tolerance_pct,
        } => {
            let limit = data.lc.amount
                * (Decimal::ONE + *tolerance_pct / Decimal::ONE_HUNDRED);

            for doc in data.documents_of_type(doc_type) {
                let Some(value) = doc.field(field) else {
                    return Err(format!("field {field} not found on {}", doc.doc_ref));
                };
                let FieldValue::Amount(amount) = value else {
                    return Err(format!("field {field} on {} is not an amount", doc.doc_ref));
                };

                if *amount > limit {
                    differences.push(FieldDifference::new(
                        doc.doc_ref.clone(),
                        field.clone(),
                        format!("at most {limit}"),
                        amount.to_string(),
                    ));
                }
            }
        }
    }

    Ok(differences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{Applicability, RuleKey};
    use crate::domain::{
        Document, Jurisdiction, LcInfo, LcType, RuleDomain, Severity,
    };
    use chrono::NaiveDate;

    fn lc(amount: i64) -> LcInfo {
        LcInfo {
            lc_number: "LC-1".to_string(),
            lc_type: LcType::Sight,
            declared_standard: None,
            jurisdiction: Jurisdiction::new("SG"),
            currency: "USD".to_string(),
            amount: Decimal::new(amount, 0),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            clauses: vec![],
        }
    }

    fn loaded(rule: Rule) -> LoadedRule {
        LoadedRule {
            domain: RuleDomain::ucp600(),
            rule,
        }
    }

    fn literal_rule(key: &str, field: &str, op: ComparisonOp, value: Option<FieldValue>) -> Rule {
        Rule {
            key: RuleKey::new(key),
            applicability: Applicability::default(),
            condition: RuleCondition::Literal {
                doc_type: DocumentType::CommercialInvoice,
                field: field.to_string(),
                op,
                value,
            },
            severity: Severity::Major,
            message: "requirement".to_string(),
            suggestion: Some("fix it".to_string()),
        }
    }

    fn semantic_rule(key: &str, check: SemanticCheck) -> Rule {
        Rule {
            key: RuleKey::new(key),
            applicability: Applicability::default(),
            condition: RuleCondition::Semantic(check),
            severity: Severity::Minor,
            message: "requirement".to_string(),
            suggestion: None,
        }
    }

    #[test]
    fn test_literal_eq_violation() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)
                .with_field("currency", FieldValue::Text("EUR".to_string()))],
        };
        let rules = vec![loaded(literal_rule(
            "R1",
            "currency",
            ComparisonOp::Eq,
            Some(FieldValue::Text("USD".to_string())),
        ))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.rules_evaluated, 1);

        let issue = &outcome.issues[0];
        assert_eq!(issue.expected.as_deref(), Some("USD"));
        assert_eq!(issue.actual.as_deref(), Some("EUR"));
        assert_eq!(issue.domain, RuleDomain::ucp600());
        assert_eq!(issue.suggestion.as_deref(), Some("fix it"));
    }

    #[test]
    fn test_literal_present_satisfied() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)
                .with_field("invoice_number", FieldValue::Text("I-1".to_string()))],
        };
        let rules = vec![loaded(literal_rule(
            "R1",
            "invoice_number",
            ComparisonOp::Present,
            None,
        ))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert!(outcome.issues.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_missing_field_skips_rule_not_batch() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)
                .with_field("currency", FieldValue::Text("USD".to_string()))],
        };
        let rules = vec![
            loaded(literal_rule(
                "R1",
                "nonexistent",
                ComparisonOp::Eq,
                Some(FieldValue::Text("x".to_string())),
            )),
            loaded(literal_rule(
                "R2",
                "currency",
                ComparisonOp::Eq,
                Some(FieldValue::Text("EUR".to_string())),
            )),
        ];

        let outcome = execute_rules(&rules, &data, &[]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].rule_key, RuleKey::new("R1"));
        assert!(outcome.skipped[0].reason.contains("not found"));
        // R2 still ran and found its violation.
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].rule_key, RuleKey::new("R2"));
    }

    #[test]
    fn test_malformed_predicate_skips() {
        // Eq with no operand is a malformed predicate.
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)
                .with_field("currency", FieldValue::Text("USD".to_string()))],
        };
        let rules = vec![loaded(literal_rule("R1", "currency", ComparisonOp::Eq, None))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].reason.contains("no operand"));
    }

    #[test]
    fn test_non_applicable_rule_silently_filtered() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![],
        };
        let mut rule = literal_rule("R1", "f", ComparisonOp::Present, None);
        rule.applicability.doc_types = vec![DocumentType::BillOfLading];

        let outcome = execute_rules(&[loaded(rule)], &data, &[]);
        assert_eq!(outcome.rules_evaluated, 0);
        assert!(outcome.issues.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_semantic_date_mismatch_one_issue_with_differences() {
        // Scenario: invoice date differs by 3 days between invoice and
        // bill of lading; one issue, one difference entry.
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![
                Document::new("INV-1", DocumentType::CommercialInvoice).with_field(
                    "invoice_date",
                    FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
                ),
                Document::new("BL-1", DocumentType::BillOfLading).with_field(
                    "invoice_date",
                    FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 4).unwrap()),
                ),
            ],
        };
        let rules = vec![loaded(semantic_rule(
            "CROSS-INV-DATE",
            SemanticCheck::FieldsConsistent {
                field: "invoice_date".to_string(),
                doc_types: vec![DocumentType::CommercialInvoice, DocumentType::BillOfLading],
                tolerance_days: 0,
            },
        ))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert_eq!(outcome.issues.len(), 1);

        let issue = &outcome.issues[0];
        assert_eq!(issue.expected.as_deref(), Some("2025-02-01"));
        assert_eq!(issue.actual.as_deref(), Some("2025-02-04"));
        assert_eq!(issue.differences.len(), 1);
        assert_eq!(issue.differences[0].doc_ref.as_str(), "BL-1");
    }

    #[test]
    fn test_semantic_date_within_tolerance() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![
                Document::new("INV-1", DocumentType::CommercialInvoice).with_field(
                    "invoice_date",
                    FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
                ),
                Document::new("BL-1", DocumentType::BillOfLading).with_field(
                    "invoice_date",
                    FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()),
                ),
            ],
        };
        let rules = vec![loaded(semantic_rule(
            "CROSS-INV-DATE",
            SemanticCheck::FieldsConsistent {
                field: "invoice_date".to_string(),
                doc_types: vec![DocumentType::CommercialInvoice, DocumentType::BillOfLading],
                tolerance_days: 3,
            },
        ))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_semantic_within_lc_expiry() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![Document::new("BL-1", DocumentType::BillOfLading).with_field(
                "shipment_date",
                FieldValue::Date(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
            )],
        };
        let rules = vec![loaded(semantic_rule(
            "UCP600-EXPIRY",
            SemanticCheck::WithinLcExpiry {
                doc_type: DocumentType::BillOfLading,
                field: "shipment_date".to_string(),
            },
        ))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0]
            .expected
            .as_ref()
            .unwrap()
            .contains("2025-06-01"));
    }

    #[test]
    fn test_semantic_amount_tolerance() {
        let data = DocumentData {
            lc: lc(100_000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)
                .with_field("total_amount", FieldValue::Amount(Decimal::new(115_000, 0)))],
        };
        let rules = vec![loaded(semantic_rule(
            "UCP600-30",
            SemanticCheck::AmountTolerance {
                doc_type: DocumentType::CommercialInvoice,
                field: "total_amount".to_string(),
                tolerance_pct: Decimal::TEN,
            },
        ))];

        let outcome = execute_rules(&rules, &data, &[]);
        assert_eq!(outcome.issues.len(), 1);
        // 110000 is the limit at 10% tolerance
        assert!(outcome.issues[0].expected.as_ref().unwrap().contains("110000"));

        // Within tolerance passes.
        let ok_data = DocumentData {
            lc: lc(100_000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)
                .with_field("total_amount", FieldValue::Amount(Decimal::new(109_000, 0)))],
        };
        let outcome = execute_rules(&rules, &ok_data, &[]);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_issue_order_follows_rule_order() {
        let data = DocumentData {
            lc: lc(1000),
            documents: vec![Document::new("INV-1", DocumentType::CommercialInvoice)],
        };
        let rules = vec![
            loaded(literal_rule("R-FIRST", "a", ComparisonOp::Present, None)),
            loaded(literal_rule("R-SECOND", "b", ComparisonOp::Present, None)),
        ];

        let outcome = execute_rules(&rules, &data, &[]);
        let keys: Vec<_> = outcome.issues.iter().map(|i| i.rule_key.as_str()).collect();
        assert_eq!(keys, vec!["R-FIRST", "R-SECOND"]);
    }
}
