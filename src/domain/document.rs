use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reference to one document within a presentation (e.g., "INV-001").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocRef(pub String);

impl DocRef {
    pub fn new(r: impl Into<String>) -> Self {
        DocRef(r.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 3166-1 alpha-2 jurisdiction code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn new(code: impl Into<String>) -> Self {
        Jurisdiction(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of a trade document in a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    LetterOfCredit,
    CommercialInvoice,
    BillOfLading,
    AirWaybill,
    InsuranceCertificate,
    CertificateOfOrigin,
    PackingList,
    DraftBill,
    InspectionCertificate,
    Other(String),
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::LetterOfCredit => write!(f, "letter_of_credit"),
            DocumentType::CommercialInvoice => write!(f, "commercial_invoice"),
            DocumentType::BillOfLading => write!(f, "bill_of_lading"),
            DocumentType::AirWaybill => write!(f, "air_waybill"),
            DocumentType::InsuranceCertificate => write!(f, "insurance_certificate"),
            DocumentType::CertificateOfOrigin => write!(f, "certificate_of_origin"),
            DocumentType::PackingList => write!(f, "packing_list"),
            DocumentType::DraftBill => write!(f, "draft_bill"),
            DocumentType::InspectionCertificate => write!(f, "inspection_certificate"),
            DocumentType::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Type of letter of credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LcType {
    Sight,
    Usance,
    Standby,
    Transferable,
    RevolvingCredit,
}

/// Typed field value extracted from a document.
///
/// Comparisons are only defined within a variant; comparing a date to an
/// amount is an evaluation error, not a mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Amount(Decimal),
    Flag(bool),
}

impl FieldValue {
    /// Display form used in issue payloads (expected/actual strings).
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => d.to_string(),
            FieldValue::Amount(a) => a.to_string(),
            FieldValue::Flag(b) => b.to_string(),
        }
    }

    /// Ordering comparison between two values of the same variant.
    ///
    /// Same-variant pairs always compare (Text lexicographically, Flag
    /// with false < true); None only when the variants differ.
    pub fn partial_cmp_value(&self, other: &FieldValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Amount(a), FieldValue::Amount(b)) => Some(a.cmp(b)),
            (FieldValue::Flag(a), FieldValue::Flag(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// One extracted document in a presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Presentation-local reference (unique within a DocumentData)
    pub doc_ref: DocRef,

    /// Document type
    pub doc_type: DocumentType,

    /// Extracted fields, keyed by canonical field name
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(doc_ref: impl Into<String>, doc_type: DocumentType) -> Self {
        Document {
            doc_ref: DocRef::new(doc_ref),
            doc_type,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion, used heavily in tests.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Core LC attributes extracted from the credit instrument itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcInfo {
    /// Issuing bank's credit number
    pub lc_number: String,

    /// Credit type
    pub lc_type: LcType,

    /// Standard declared on the credit face (e.g., "UCP600"), if any
    #[serde(default)]
    pub declared_standard: Option<String>,

    /// Governing jurisdiction
    pub jurisdiction: Jurisdiction,

    /// Currency code of the credit amount
    pub currency: String,

    /// Credit amount
    pub amount: Decimal,

    /// Issue date
    pub issue_date: NaiveDate,

    /// Expiry date for presentation
    pub expiry_date: NaiveDate,

    /// Free-text clauses from the credit, scanned for supplement signals
    #[serde(default)]
    pub clauses: Vec<String>,
}

/// Fully-extracted, read-only representation of an LC and its supporting
/// documents. Produced upstream by the extraction pipeline; the engine
/// never performs extraction itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentData {
    pub lc: LcInfo,

    /// Supporting documents in presentation order
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl DocumentData {
    /// Structural soundness check performed at the public entry point.
    ///
    /// Extraction quality is out of scope here; this only rejects inputs
    /// the pipeline cannot meaningfully evaluate.
    pub fn validate(&self) -> Result<(), String> {
        if self.lc.lc_number.trim().is_empty() {
            return Err("LC number is empty".to_string());
        }

        if self.lc.expiry_date < self.lc.issue_date {
            return Err(format!(
                "LC expiry date {} precedes issue date {}",
                self.lc.expiry_date, self.lc.issue_date
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for doc in &self.documents {
            if !seen.insert(&doc.doc_ref) {
                return Err(format!("duplicate document reference: {}", doc.doc_ref));
            }
        }

        Ok(())
    }

    /// All documents of a given type, in presentation order.
    pub fn documents_of_type<'a>(
        &'a self,
        doc_type: &'a DocumentType,
    ) -> impl Iterator<Item = &'a Document> {
        self.documents.iter().filter(move |d| &d.doc_type == doc_type)
    }

    /// First document of a given type, if present.
    pub fn first_of_type<'a>(&'a self, doc_type: &'a DocumentType) -> Option<&'a Document> {
        self.documents_of_type(doc_type).next()
    }

    /// True if at least one document of the type was supplied.
    pub fn has_document(&self, doc_type: &DocumentType) -> bool {
        self.first_of_type(doc_type).is_some()
    }

    /// True if any LC clause contains the given phrase (case-insensitive).
    pub fn has_clause_containing(&self, phrase: &str) -> bool {
        let needle = phrase.to_lowercase();
        self.lc
            .clauses
            .iter()
            .any(|c| c.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_lc() -> LcInfo {
        LcInfo {
            lc_number: "LC-2025-0001".to_string(),
            lc_type: LcType::Sight,
            declared_standard: Some("UCP600".to_string()),
            jurisdiction: Jurisdiction::new("sg"),
            currency: "USD".to_string(),
            amount: Decimal::new(100_000, 0),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            clauses: vec!["Presentation under eUCP version 2.1 permitted".to_string()],
        }
    }

    #[test]
    fn test_jurisdiction_normalized() {
        assert_eq!(Jurisdiction::new("sg").as_str(), "SG");
    }

    #[test]
    fn test_field_value_compare() {
        let a = FieldValue::Amount(Decimal::new(100, 0));
        let b = FieldValue::Amount(Decimal::new(200, 0));
        assert_eq!(a.partial_cmp_value(&b), Some(std::cmp::Ordering::Less));

        let t = FieldValue::Text("x".to_string());
        assert_eq!(a.partial_cmp_value(&t), None);
    }

    #[test]
    fn test_validate_ok() {
        let data = DocumentData {
            lc: test_lc(),
            documents: vec![
                Document::new("INV-1", DocumentType::CommercialInvoice),
                Document::new("BL-1", DocumentType::BillOfLading),
            ],
        };
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_lc_number() {
        let mut lc = test_lc();
        lc.lc_number = "  ".to_string();
        let data = DocumentData {
            lc,
            documents: vec![],
        };
        assert!(data.validate().unwrap_err().contains("LC number"));
    }

    #[test]
    fn test_validate_rejects_duplicate_doc_refs() {
        let data = DocumentData {
            lc: test_lc(),
            documents: vec![
                Document::new("INV-1", DocumentType::CommercialInvoice),
                Document::new("INV-1", DocumentType::PackingList),
            ],
        };
        assert!(data.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_clause_scan() {
        let data = DocumentData {
            lc: test_lc(),
            documents: vec![],
        };
        assert!(data.has_clause_containing("eucp"));
        assert!(!data.has_clause_containing("sanctions"));
    }
}
