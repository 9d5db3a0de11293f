use serde::Deserialize;
use std::time::Duration;

/// Validation engine configuration.
///
/// The engine is consumed as an in-process library; whatever shell hosts
/// it owns files, flags, and environment, and hands a finished config in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for a single rule-set fetch, in milliseconds. A primary
    /// fetch that times out fails the validation closed; a supplemental
    /// one degrades coverage.
    pub rule_fetch_timeout_ms: u64,

    /// Feature toggles; rules gated on a toggle not listed here are
    /// silently non-applicable.
    pub enabled_features: Vec<String>,

    /// Wrap the rule store in the read-through cache.
    pub cache_rule_sets: bool,
}

impl EngineConfig {
    /// Rule-set fetch timeout as Duration.
    pub fn rule_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_fetch_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rule_fetch_timeout_ms: 2_000,
            enabled_features: Vec::new(),
            cache_rule_sets: true,
        }
    }
}
