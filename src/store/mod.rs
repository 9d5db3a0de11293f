pub mod cache;
pub mod fixture;
pub mod mock;
pub mod postgres;
pub mod traits;

pub use cache::CachedRuleStore;
pub use fixture::{FixtureError, FixtureRuleStore};
pub use mock::MockStore;
pub use postgres::PostgresStore;
pub use traits::{AuditSink, PolicyStore, RuleContext, RuleStore};
