use std::collections::HashMap;
use tracing::debug;

use crate::domain::{DocumentData, LcType, RuleDomain};

/// Resolve the ordered, deduplicated domain sequence for a validation.
///
/// This stage cannot fail: ambiguous or empty signals always resolve to a
/// non-empty sequence with a safe default primary. Only rule loading is
/// allowed to abort a validation, never resolution.
///
/// Order: primary first, then supplements detected from document content,
/// then caller-supplied supplements, then (at most once) the CROSS_DOC
/// consolidation domain when two resolved domains are variants of one
/// rule family.
pub fn resolve_domains(
    explicit_domain: Option<RuleDomain>,
    data: &DocumentData,
    explicit_supplements: &[RuleDomain],
) -> Vec<RuleDomain> {
    let primary = explicit_domain.unwrap_or_else(|| infer_primary(data));

    let mut sequence = vec![primary];
    sequence.extend(detect_supplements(data));
    sequence.extend(explicit_supplements.iter().cloned());

    // Order-preserving dedup; the primary never moves from position 0.
    let mut seen = std::collections::HashSet::new();
    sequence.retain(|d| seen.insert(d.clone()));

    if needs_consolidation(&sequence) {
        sequence.push(RuleDomain::cross_doc());
    }

    debug!(domains = ?sequence, "resolved rule domains");
    sequence
}

/// Infer the primary domain from document signals.
fn infer_primary(data: &DocumentData) -> RuleDomain {
    if let Some(standard) = &data.lc.declared_standard {
        let s = standard.to_uppercase();
        if s.contains("ISP") {
            return RuleDomain::isp98();
        }
        if s.contains("URC") {
            return RuleDomain::urc522();
        }
        if s.contains("UCP") {
            return RuleDomain::ucp600();
        }
    }

    if data.lc.lc_type == LcType::Standby {
        return RuleDomain::isp98();
    }

    // Safe default: documentary credit rules.
    RuleDomain::ucp600()
}

/// Supplements implied by document content, in fixed precedence order.
fn detect_supplements(data: &DocumentData) -> Vec<RuleDomain> {
    let mut supplements = Vec::new();

    if data.has_clause_containing("eucp") || data.has_clause_containing("electronic presentation") {
        supplements.push(RuleDomain::eucp());
    }

    if data.has_clause_containing("sanction") {
        supplements.push(RuleDomain::sanctions());
    }

    // Multi-document presentations get examination-practice scrutiny.
    if data.documents.len() > 1 {
        supplements.push(RuleDomain::isbp821());
    }

    supplements
}

/// True when two or more domains in the sequence are variants of one
/// rule family (e.g. UCP600 + EUCP). The consolidation domain is
/// appended at most once regardless of how many families trigger.
fn needs_consolidation(sequence: &[RuleDomain]) -> bool {
    let mut families: HashMap<&str, usize> = HashMap::new();
    for domain in sequence {
        *families.entry(domain.family()).or_insert(0) += 1;
    }
    families.values().any(|&count| count >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, DocumentData, DocumentType, Jurisdiction, LcInfo};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn data(
        lc_type: LcType,
        declared: Option<&str>,
        clauses: Vec<&str>,
        doc_count: usize,
    ) -> DocumentData {
        DocumentData {
            lc: LcInfo {
                lc_number: "LC-1".to_string(),
                lc_type,
                declared_standard: declared.map(String::from),
                jurisdiction: Jurisdiction::new("SG"),
                currency: "USD".to_string(),
                amount: Decimal::new(10_000, 0),
                issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                expiry_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                clauses: clauses.into_iter().map(String::from).collect(),
            },
            documents: (0..doc_count)
                .map(|i| Document::new(format!("D-{i}"), DocumentType::CommercialInvoice))
                .collect(),
        }
    }

    #[test]
    fn test_explicit_primary_pinned_first() {
        let d = data(LcType::Sight, Some("ISP98"), vec![], 0);
        let resolved = resolve_domains(Some(RuleDomain::urc522()), &d, &[]);
        assert_eq!(resolved[0], RuleDomain::urc522());
    }

    #[test]
    fn test_primary_inferred_from_declared_standard() {
        let d = data(LcType::Sight, Some("ISP98"), vec![], 0);
        assert_eq!(resolve_domains(None, &d, &[])[0], RuleDomain::isp98());

        let d = data(LcType::Sight, Some("URC 522"), vec![], 0);
        assert_eq!(resolve_domains(None, &d, &[])[0], RuleDomain::urc522());
    }

    #[test]
    fn test_standby_without_standard_infers_isp98() {
        let d = data(LcType::Standby, None, vec![], 0);
        assert_eq!(resolve_domains(None, &d, &[])[0], RuleDomain::isp98());
    }

    #[test]
    fn test_default_primary_on_empty_input() {
        let d = data(LcType::Sight, None, vec![], 0);
        let resolved = resolve_domains(None, &d, &[]);
        assert_eq!(resolved, vec![RuleDomain::ucp600()]);
    }

    #[test]
    fn test_content_supplements_before_explicit() {
        let d = data(
            LcType::Sight,
            None,
            vec!["Subject to eUCP v2.1", "Standard sanctions clause applies"],
            0,
        );
        let resolved = resolve_domains(None, &d, &[RuleDomain::isbp821()]);
        // eucp + ucp600 share the UCP family, so CROSS_DOC is appended.
        assert_eq!(
            resolved,
            vec![
                RuleDomain::ucp600(),
                RuleDomain::eucp(),
                RuleDomain::sanctions(),
                RuleDomain::isbp821(),
                RuleDomain::cross_doc(),
            ]
        );
    }

    #[test]
    fn test_consolidation_appended_once() {
        let d = data(LcType::Sight, None, vec!["eucp applies"], 3);
        let resolved = resolve_domains(None, &d, &[RuleDomain::eucp()]);
        let cross_count = resolved
            .iter()
            .filter(|x| **x == RuleDomain::cross_doc())
            .count();
        assert_eq!(cross_count, 1);
        assert_eq!(resolved.last(), Some(&RuleDomain::cross_doc()));
    }

    #[test]
    fn test_no_consolidation_for_single_family_variants() {
        let d = data(LcType::Standby, Some("ISP98"), vec![], 0);
        let resolved = resolve_domains(None, &d, &[RuleDomain::sanctions()]);
        assert!(!resolved.contains(&RuleDomain::cross_doc()));
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let d = data(LcType::Sight, None, vec![], 2);
        let resolved = resolve_domains(
            None,
            &d,
            &[
                RuleDomain::isbp821(), // duplicate of content-detected supplement
                RuleDomain::sanctions(),
            ],
        );
        assert_eq!(
            resolved,
            vec![
                RuleDomain::ucp600(),
                RuleDomain::isbp821(),
                RuleDomain::sanctions(),
            ]
        );
    }
}
