pub mod executor;
pub mod loader;
pub mod overlay;
pub mod resolver;
pub mod verdict;

pub use executor::{execute_rules, ExecutionOutcome};
pub use loader::{LoadError, LoadMetadata, LoadOutcome, LoadedRule, RuleLoader};
pub use overlay::PolicyWriter;
pub use resolver::resolve_domains;
pub use verdict::build_verdict;

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::{BankId, DocumentData, DocumentType, RuleDomain, ValidationResult};
use crate::observability::MetricsRegistry;
use crate::store::{AuditSink, CachedRuleStore, PolicyStore, RuleStore};

/// Errors crossing the public entry point.
///
/// Everything else the pipeline encounters is absorbed into the verdict
/// as data (provenance entries, skip markers). A caller either gets a
/// complete, explainable result or one of these.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// The document data is structurally unusable, distinct from a
    /// document that fails validation.
    #[error("invalid document data: {0}")]
    InvalidDocument(String),

    /// The primary rule set could not be loaded (fail-closed).
    #[error(transparent)]
    RulesUnavailable(#[from] LoadError),
}

/// One validation request.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub document_data: DocumentData,
    pub explicit_domain: Option<RuleDomain>,
    pub explicit_supplements: Vec<RuleDomain>,
    pub bank_id: Option<BankId>,
}

impl ValidationRequest {
    pub fn new(document_data: DocumentData) -> Self {
        ValidationRequest {
            document_data,
            explicit_domain: None,
            explicit_supplements: Vec::new(),
            bank_id: None,
        }
    }

    pub fn with_domain(mut self, domain: RuleDomain) -> Self {
        self.explicit_domain = Some(domain);
        self
    }

    pub fn with_supplements(mut self, supplements: Vec<RuleDomain>) -> Self {
        self.explicit_supplements = supplements;
        self
    }

    pub fn with_bank(mut self, bank_id: BankId) -> Self {
        self.bank_id = Some(bank_id);
        self
    }
}

/// The document validation engine.
///
/// Stateless across requests: all per-request data is request-scoped, so
/// any number of validations can run concurrently over one engine.
pub struct ValidationEngine {
    loader: RuleLoader,
    policy_writer: PolicyWriter,
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
}

impl ValidationEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        policies: Arc<dyn PolicyStore>,
        audit: Arc<dyn AuditSink>,
        config: EngineConfig,
    ) -> Self {
        let rules: Arc<dyn RuleStore> = if config.cache_rule_sets {
            Arc::new(CachedRuleStore::new(rules))
        } else {
            rules
        };

        let metrics = Arc::new(MetricsRegistry::new());

        ValidationEngine {
            loader: RuleLoader::new(rules, config.rule_fetch_timeout()),
            policy_writer: PolicyWriter::new(policies, audit, metrics.clone()),
            config,
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        self.metrics.clone()
    }

    /// Validate a document set end to end.
    ///
    /// Fails only when the document data is structurally invalid or the
    /// primary rule set cannot be loaded; supplemental failures, rule
    /// skips, and policy/audit failures all degrade into the result.
    #[instrument(skip(self, request), fields(lc = %request.document_data.lc.lc_number))]
    pub async fn validate_document(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResult, ValidateError> {
        let _timing = crate::observability::TimingGuard::new(&self.metrics);

        request
            .document_data
            .validate()
            .map_err(ValidateError::InvalidDocument)?;

        let data = &request.document_data;

        let domains = resolve_domains(
            request.explicit_domain.clone(),
            data,
            &request.explicit_supplements,
        );

        let outcome = self
            .loader
            .load(
                &domains,
                &data.lc.jurisdiction,
                &DocumentType::LetterOfCredit,
            )
            .await
            .inspect_err(|_| self.metrics.record_primary_load_failure())?;

        self.metrics
            .record_supplement_failures(outcome.provenance.iter().filter(|p| !p.is_loaded()).count());

        let metadata = outcome.metadata;
        let execution = execute_rules(&outcome.rules, data, &self.config.enabled_features);
        self.metrics.record_rules(
            execution.rules_evaluated,
            execution.issues.len(),
            execution.skipped.len(),
        );

        let result = build_verdict(
            Uuid::new_v4(),
            &data.lc.lc_number,
            execution,
            outcome.provenance,
        );

        let result = match &request.bank_id {
            Some(bank_id) => {
                let applied = self.policy_writer.apply_bank_policy(&result, bank_id).await;
                self.metrics.record_policy_application();
                applied
            }
            None => result,
        };

        info!(
            result_id = %result.result_id,
            primary = %metadata.primary_domain,
            domains = metadata.domains_requested,
            issues = result.issues.len(),
            degraded = result.degraded_domains().count(),
            "validation complete"
        );
        self.metrics.record_verdict(&result);

        Ok(result)
    }
}
