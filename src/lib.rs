pub mod config;
pub mod domain;
pub mod engine;
pub mod observability;
pub mod store;

pub use config::EngineConfig;
pub use domain::{DocumentData, RuleDomain, Severity, ValidationResult};
pub use engine::{ValidateError, ValidationEngine, ValidationRequest};
