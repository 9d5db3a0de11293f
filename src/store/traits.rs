use async_trait::async_trait;

use crate::domain::{
    AuditEvent, BankId, DocumentType, Jurisdiction, PolicyException, PolicyOverlay, RuleDomain,
    RuleSet,
};

/// Lookup context for a rule-set fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleContext {
    pub domain: RuleDomain,
    pub jurisdiction: Jurisdiction,
    pub document_type: DocumentType,
}

impl RuleContext {
    pub fn new(domain: RuleDomain, jurisdiction: Jurisdiction, document_type: DocumentType) -> Self {
        RuleContext {
            domain,
            jurisdiction,
            document_type,
        }
    }
}

/// Read-only query interface over the externally-owned rule store.
///
/// Fetches must be idempotent and side-effect-free; `Ok(None)` means the
/// store has no rule set for the context (distinct from a fetch error).
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn fetch_rule_set(&self, ctx: &RuleContext) -> anyhow::Result<Option<RuleSet>>;
}

/// Read-only query interface over the bank policy store.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get_active_overlay(&self, bank_id: &BankId) -> anyhow::Result<Option<PolicyOverlay>>;
    async fn get_active_exceptions(&self, bank_id: &BankId) -> anyhow::Result<Vec<PolicyException>>;
}

/// Append-only audit sink.
///
/// Batch writes are atomic in implementations: a failed batch leaves no
/// partial rows behind.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write_audit_event(&self, event: &AuditEvent) -> anyhow::Result<()>;
    async fn write_audit_batch(&self, events: &[AuditEvent]) -> anyhow::Result<()>;
}
