use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::{Severity, ValidationResult};

/// Metrics registry for the validation engine.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Total validation requests completed
    pub validations_total: AtomicU64,

    /// Completed validations by worst issue severity
    pub verdicts_clean: AtomicU64,
    pub verdicts_info: AtomicU64,
    pub verdicts_minor: AtomicU64,
    pub verdicts_major: AtomicU64,
    pub verdicts_critical: AtomicU64,

    /// Validation latency buckets (microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_1_5ms: AtomicU64,
    pub latency_5_10ms: AtomicU64,
    pub latency_10_50ms: AtomicU64,
    pub latency_50_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,

    /// Rule evaluation counts
    pub rules_evaluated_total: AtomicU64,
    pub rules_triggered_total: AtomicU64,
    pub rules_skipped_total: AtomicU64,

    /// Rule loading
    pub primary_load_failures: AtomicU64,
    pub supplement_load_failures: AtomicU64,

    /// Bank policy applications
    pub policy_applications_total: AtomicU64,

    /// Audit trail batch writes that failed
    pub audit_write_errors: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record a completed verdict by its worst severity.
    pub fn record_verdict(&self, result: &ValidationResult) {
        self.validations_total.fetch_add(1, Ordering::Relaxed);

        match result.worst_severity() {
            None => {
                self.verdicts_clean.fetch_add(1, Ordering::Relaxed);
            }
            Some(Severity::Info) => {
                self.verdicts_info.fetch_add(1, Ordering::Relaxed);
            }
            Some(Severity::Minor) => {
                self.verdicts_minor.fetch_add(1, Ordering::Relaxed);
            }
            Some(Severity::Major) => {
                self.verdicts_major.fetch_add(1, Ordering::Relaxed);
            }
            Some(Severity::Critical) => {
                self.verdicts_critical.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record validation latency.
    pub fn record_latency(&self, start: Instant) {
        let micros = start.elapsed().as_micros() as u64;

        if micros < 1000 {
            self.latency_under_1ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 5000 {
            self.latency_1_5ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 10000 {
            self.latency_5_10ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 50000 {
            self.latency_10_50ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 100000 {
            self.latency_50_100ms.fetch_add(1, Ordering::Relaxed);
        } else {
            self.latency_over_100ms.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record rule evaluation counts for one request.
    pub fn record_rules(&self, evaluated: usize, triggered: usize, skipped: usize) {
        self.rules_evaluated_total
            .fetch_add(evaluated as u64, Ordering::Relaxed);
        self.rules_triggered_total
            .fetch_add(triggered as u64, Ordering::Relaxed);
        self.rules_skipped_total
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    /// Record a fail-closed primary load failure.
    pub fn record_primary_load_failure(&self) {
        self.primary_load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record supplemental domains that failed to load for one request.
    pub fn record_supplement_failures(&self, count: usize) {
        self.supplement_load_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a bank policy application.
    pub fn record_policy_application(&self) {
        self.policy_applications_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed audit batch write.
    pub fn record_audit_write_error(&self) {
        self.audit_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP lcval_validations_total Total validation requests completed
# TYPE lcval_validations_total counter
lcval_validations_total {}

# HELP lcval_verdicts Completed validations by worst severity
# TYPE lcval_verdicts counter
lcval_verdicts{{worst="clean"}} {}
lcval_verdicts{{worst="info"}} {}
lcval_verdicts{{worst="minor"}} {}
lcval_verdicts{{worst="major"}} {}
lcval_verdicts{{worst="critical"}} {}

# HELP lcval_validation_latency_bucket Validation latency histogram
# TYPE lcval_validation_latency_bucket counter
lcval_validation_latency_bucket{{le="0.001"}} {}
lcval_validation_latency_bucket{{le="0.005"}} {}
lcval_validation_latency_bucket{{le="0.01"}} {}
lcval_validation_latency_bucket{{le="0.05"}} {}
lcval_validation_latency_bucket{{le="0.1"}} {}
lcval_validation_latency_bucket{{le="+Inf"}} {}

# HELP lcval_rules_evaluated_total Total rule evaluations
# TYPE lcval_rules_evaluated_total counter
lcval_rules_evaluated_total {}

# HELP lcval_rules_triggered_total Total rules that emitted an issue
# TYPE lcval_rules_triggered_total counter
lcval_rules_triggered_total {}

# HELP lcval_rules_skipped_total Total rules skipped as unevaluable
# TYPE lcval_rules_skipped_total counter
lcval_rules_skipped_total {}

# HELP lcval_primary_load_failures_total Fail-closed primary rule-set load failures
# TYPE lcval_primary_load_failures_total counter
lcval_primary_load_failures_total {}

# HELP lcval_supplement_load_failures_total Supplemental rule-set load failures
# TYPE lcval_supplement_load_failures_total counter
lcval_supplement_load_failures_total {}

# HELP lcval_policy_applications_total Bank policy overlay applications
# TYPE lcval_policy_applications_total counter
lcval_policy_applications_total {}

# HELP lcval_audit_write_errors_total Failed audit trail batch writes
# TYPE lcval_audit_write_errors_total counter
lcval_audit_write_errors_total {}
"#,
            self.validations_total.load(Ordering::Relaxed),
            self.verdicts_clean.load(Ordering::Relaxed),
            self.verdicts_info.load(Ordering::Relaxed),
            self.verdicts_minor.load(Ordering::Relaxed),
            self.verdicts_major.load(Ordering::Relaxed),
            self.verdicts_critical.load(Ordering::Relaxed),
            self.latency_under_1ms.load(Ordering::Relaxed),
            self.latency_1_5ms.load(Ordering::Relaxed),
            self.latency_5_10ms.load(Ordering::Relaxed),
            self.latency_10_50ms.load(Ordering::Relaxed),
            self.latency_50_100ms.load(Ordering::Relaxed),
            self.latency_over_100ms.load(Ordering::Relaxed),
            self.rules_evaluated_total.load(Ordering::Relaxed),
            self.rules_triggered_total.load(Ordering::Relaxed),
            self.rules_skipped_total.load(Ordering::Relaxed),
            self.primary_load_failures.load(Ordering::Relaxed),
            self.supplement_load_failures.load(Ordering::Relaxed),
            self.policy_applications_total.load(Ordering::Relaxed),
            self.audit_write_errors.load(Ordering::Relaxed),
        )
    }
}

/// Guard for timing operations.
pub struct TimingGuard<'a> {
    registry: &'a MetricsRegistry,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(registry: &'a MetricsRegistry) -> Self {
        TimingGuard {
            registry,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.registry.record_latency(self.start);
    }
}
