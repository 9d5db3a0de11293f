use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::domain::RuleSet;

use super::traits::{RuleContext, RuleStore};

/// Read-through cache over a rule store.
///
/// Keyed by the full lookup context (domain, jurisdiction, document
/// type); entries are read-only from the engine's perspective and
/// invalidation is the rule store's responsibility. Negative results and
/// errors are never cached, so a recovering store is retried on the next
/// request.
pub struct CachedRuleStore {
    inner: Arc<dyn RuleStore>,
    cache: RwLock<AHashMap<RuleContext, RuleSet>>,
}

impl CachedRuleStore {
    pub fn new(inner: Arc<dyn RuleStore>) -> Self {
        CachedRuleStore {
            inner,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    /// Number of cached rule sets.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Drop all cached entries. Exposed for the store owner's
    /// invalidation path, never called by the engine.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

#[async_trait]
impl RuleStore for CachedRuleStore {
    async fn fetch_rule_set(&self, ctx: &RuleContext) -> anyhow::Result<Option<RuleSet>> {
        if let Some(hit) = self.cache.read().get(ctx) {
            return Ok(Some(hit.clone()));
        }

        let fetched = self.inner.fetch_rule_set(ctx).await?;

        if let Some(ruleset) = &fetched {
            debug!(domain = %ctx.domain, version = %ruleset.version, "caching rule set");
            self.cache.write().insert(ctx.clone(), ruleset.clone());
        }

        Ok(fetched)
    }
}
