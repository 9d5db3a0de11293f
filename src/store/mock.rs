use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::{
    AuditEvent, BankId, PolicyException, PolicyOverlay, RuleDomain, RuleSet,
};

use super::traits::{AuditSink, PolicyStore, RuleContext, RuleStore};

/// In-memory store for testing, implementing all three store traits.
///
/// Supports per-domain failure and latency injection so loader and policy
/// failure paths can be exercised deterministically.
#[derive(Default)]
pub struct MockStore {
    rule_sets: Mutex<HashMap<RuleDomain, RuleSet>>,
    failing_domains: Mutex<HashMap<RuleDomain, String>>,
    slow_domains: Mutex<HashMap<RuleDomain, Duration>>,
    overlays: Mutex<HashMap<BankId, PolicyOverlay>>,
    exceptions: Mutex<HashMap<BankId, Vec<PolicyException>>>,
    overlay_fetch_fails: Mutex<bool>,
    audit_fails: Mutex<bool>,
    written_events: Mutex<Vec<AuditEvent>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule set for a domain (any jurisdiction/doc type).
    pub fn put_rule_set(&self, ruleset: RuleSet) {
        self.rule_sets
            .lock()
            .insert(ruleset.domain.clone(), ruleset);
    }

    /// Make fetches for a domain return an error.
    pub fn fail_domain(&self, domain: RuleDomain, reason: impl Into<String>) {
        self.failing_domains.lock().insert(domain, reason.into());
    }

    /// Make fetches for a domain sleep before responding (for timeout tests).
    pub fn delay_domain(&self, domain: RuleDomain, delay: Duration) {
        self.slow_domains.lock().insert(domain, delay);
    }

    /// Register a bank overlay.
    pub fn put_overlay(&self, overlay: PolicyOverlay) {
        self.overlays.lock().insert(overlay.bank_id.clone(), overlay);
    }

    /// Register bank exceptions.
    pub fn put_exceptions(&self, bank_id: BankId, exceptions: Vec<PolicyException>) {
        self.exceptions.lock().insert(bank_id, exceptions);
    }

    /// Make overlay/exception fetches fail.
    pub fn fail_policy_fetches(&self, fail: bool) {
        *self.overlay_fetch_fails.lock() = fail;
    }

    /// Make audit writes fail.
    pub fn fail_audit_writes(&self, fail: bool) {
        *self.audit_fails.lock() = fail;
    }

    /// Audit events written so far (for assertions).
    pub fn written_events(&self) -> Vec<AuditEvent> {
        self.written_events.lock().clone()
    }
}

#[async_trait]
impl RuleStore for MockStore {
    async fn fetch_rule_set(&self, ctx: &RuleContext) -> anyhow::Result<Option<RuleSet>> {
        let delay = self.slow_domains.lock().get(&ctx.domain).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = self.failing_domains.lock().get(&ctx.domain) {
            anyhow::bail!("{}", reason);
        }

        Ok(self.rule_sets.lock().get(&ctx.domain).cloned())
    }
}

#[async_trait]
impl PolicyStore for MockStore {
    async fn get_active_overlay(&self, bank_id: &BankId) -> anyhow::Result<Option<PolicyOverlay>> {
        if *self.overlay_fetch_fails.lock() {
            anyhow::bail!("policy store unavailable");
        }
        Ok(self.overlays.lock().get(bank_id).cloned())
    }

    async fn get_active_exceptions(
        &self,
        bank_id: &BankId,
    ) -> anyhow::Result<Vec<PolicyException>> {
        if *self.overlay_fetch_fails.lock() {
            anyhow::bail!("policy store unavailable");
        }
        Ok(self
            .exceptions
            .lock()
            .get(bank_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl AuditSink for MockStore {
    async fn write_audit_event(&self, event: &AuditEvent) -> anyhow::Result<()> {
        if *self.audit_fails.lock() {
            anyhow::bail!("audit sink unavailable");
        }
        self.written_events.lock().push(event.clone());
        Ok(())
    }

    async fn write_audit_batch(&self, events: &[AuditEvent]) -> anyhow::Result<()> {
        // Atomic: nothing is recorded when the sink is failing.
        if *self.audit_fails.lock() {
            anyhow::bail!("audit sink unavailable");
        }
        self.written_events.lock().extend_from_slice(events);
        Ok(())
    }
}
