pub mod document;
pub mod issue;
pub mod policy;
pub mod rule;
pub mod severity;
pub mod verdict;

pub use document::{DocRef, Document, DocumentData, DocumentType, FieldValue, Jurisdiction, LcInfo, LcType};
pub use issue::{FieldDifference, Issue, RuleSkip};
pub use policy::{AuditEvent, AuditKind, BankId, ExceptionAction, OverlayAction, PolicyException, PolicyOverlay};
pub use rule::{Applicability, ComparisonOp, Rule, RuleCondition, RuleDomain, RuleKey, RuleSet, SemanticCheck};
pub use severity::Severity;
pub use verdict::{LoadStatus, ProvenanceEntry, ValidationResult, VerdictSummary};
