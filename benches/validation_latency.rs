use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use lcval::domain::rule::{Applicability, ComparisonOp, Rule, RuleCondition, RuleKey, SemanticCheck};
use lcval::domain::{
    Document, DocumentData, DocumentType, FieldValue, Jurisdiction, LcInfo, LcType,
    ProvenanceEntry, RuleDomain, Severity,
};
use lcval::engine::{build_verdict, execute_rules, LoadedRule};

fn create_test_data(doc_count: usize) -> DocumentData {
    DocumentData {
        lc: LcInfo {
            lc_number: "LC-2025-0001".to_string(),
            lc_type: LcType::Sight,
            declared_standard: Some("UCP600".to_string()),
            jurisdiction: Jurisdiction::new("SG"),
            currency: "USD".to_string(),
            amount: Decimal::new(100_000, 0),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            clauses: vec![],
        },
        documents: (0..doc_count)
            .map(|i| {
                Document::new(format!("INV-{i}"), DocumentType::CommercialInvoice)
                    .with_field("currency", FieldValue::Text("USD".to_string()))
                    .with_field(
                        "invoice_date",
                        FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
                    )
                    .with_field("total_amount", FieldValue::Amount(Decimal::new(95_000, 0)))
            })
            .collect(),
    }
}

fn literal_rules(count: usize) -> Vec<LoadedRule> {
    (0..count)
        .map(|i| LoadedRule {
            domain: RuleDomain::ucp600(),
            rule: Rule {
                key: RuleKey::new(format!("R{i}")),
                applicability: Applicability::default(),
                condition: RuleCondition::Literal {
                    doc_type: DocumentType::CommercialInvoice,
                    field: "currency".to_string(),
                    op: ComparisonOp::Eq,
                    value: Some(FieldValue::Text("USD".to_string())),
                },
                severity: Severity::Minor,
                message: "currency mismatch".to_string(),
                suggestion: None,
            },
        })
        .collect()
}

fn semantic_rules(count: usize) -> Vec<LoadedRule> {
    (0..count)
        .map(|i| LoadedRule {
            domain: RuleDomain::cross_doc(),
            rule: Rule {
                key: RuleKey::new(format!("S{i}")),
                applicability: Applicability::default(),
                condition: RuleCondition::Semantic(SemanticCheck::FieldsConsistent {
                    field: "invoice_date".to_string(),
                    doc_types: vec![DocumentType::CommercialInvoice],
                    tolerance_days: 0,
                }),
                severity: Severity::Minor,
                message: "date mismatch".to_string(),
                suggestion: None,
            },
        })
        .collect()
}

fn bench_literal_execution(c: &mut Criterion) {
    let data = create_test_data(5);
    let rules = literal_rules(50);

    c.bench_function("execute_50_literal_rules_5_docs", |b| {
        b.iter(|| execute_rules(black_box(&rules), black_box(&data), &[]))
    });
}

fn bench_semantic_execution(c: &mut Criterion) {
    let data = create_test_data(10);
    let rules = semantic_rules(20);

    c.bench_function("execute_20_semantic_rules_10_docs", |b| {
        b.iter(|| execute_rules(black_box(&rules), black_box(&data), &[]))
    });
}

fn bench_verdict_build(c: &mut Criterion) {
    let data = create_test_data(5);
    let mut rules = literal_rules(30);
    rules.extend(semantic_rules(10));

    let provenance = vec![
        ProvenanceEntry::loaded(RuleDomain::ucp600(), 30, "v1"),
        ProvenanceEntry::loaded(RuleDomain::cross_doc(), 10, "v1"),
    ];
    let id = Uuid::new_v4();

    c.bench_function("build_verdict_40_rules", |b| {
        b.iter(|| {
            let execution = execute_rules(&rules, &data, &[]);
            build_verdict(
                black_box(id),
                "LC-2025-0001",
                execution,
                provenance.clone(),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_literal_execution,
    bench_semantic_execution,
    bench_verdict_build
);
criterion_main!(benches);
