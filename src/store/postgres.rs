use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    AuditEvent, BankId, ExceptionAction, PolicyException, PolicyOverlay, RuleDomain, RuleKey,
    RuleSet,
};

use super::traits::{AuditSink, PolicyStore, RuleContext, RuleStore};

/// PostgreSQL implementation of the rule, policy, and audit stores.
///
/// Rule and overlay payloads are stored as JSONB; the engine only ever
/// reads rules and overlays, and only ever appends audit rows.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgresStore instance with a connection pool.
    pub async fn connect(
        database_url: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RuleStore for PostgresStore {
    async fn fetch_rule_set(&self, ctx: &RuleContext) -> anyhow::Result<Option<RuleSet>> {
        // A rule set row may be scoped to a jurisdiction/document type or
        // apply globally (NULL scope columns); scoped rows win.
        let row = sqlx::query(
            r#"
            SELECT domain, version, rules
            FROM rule_sets
            WHERE domain = $1
              AND active = true
              AND (jurisdiction = $2 OR jurisdiction IS NULL)
              AND (document_type = $3 OR document_type IS NULL)
            ORDER BY jurisdiction NULLS LAST, document_type NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(ctx.domain.as_str())
        .bind(ctx.jurisdiction.as_str())
        .bind(ctx.document_type.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let domain: String = row.get("domain");
        let version: String = row.get("version");
        let rules: serde_json::Value = row.get("rules");

        Ok(Some(RuleSet {
            domain: RuleDomain::new(domain),
            version,
            rules: serde_json::from_value(rules)?,
        }))
    }
}

#[async_trait]
impl PolicyStore for PostgresStore {
    async fn get_active_overlay(&self, bank_id: &BankId) -> anyhow::Result<Option<PolicyOverlay>> {
        let row = sqlx::query(
            r#"
            SELECT id, version, actions
            FROM policy_overlays
            WHERE bank_id = $1
              AND active = true
            LIMIT 1
            "#,
        )
        .bind(bank_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let overlay_id: Uuid = row.get("id");
        let version: String = row.get("version");
        let actions: serde_json::Value = row.get("actions");

        Ok(Some(PolicyOverlay {
            overlay_id,
            bank_id: bank_id.clone(),
            version,
            actions: serde_json::from_value(actions)?,
        }))
    }

    async fn get_active_exceptions(
        &self,
        bank_id: &BankId,
    ) -> anyhow::Result<Vec<PolicyException>> {
        let rows = sqlx::query(
            r#"
            SELECT id, rule_key, action, expires_at
            FROM policy_exceptions
            WHERE bank_id = $1
              AND active = true
              AND (expires_at IS NULL OR expires_at > now())
            ORDER BY created_at
            "#,
        )
        .bind(bank_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let action: serde_json::Value = row.get("action");
                let action: ExceptionAction = serde_json::from_value(action)?;

                Ok(PolicyException {
                    exception_id: row.get("id"),
                    bank_id: bank_id.clone(),
                    rule_key: RuleKey::new(row.get::<String, _>("rule_key")),
                    action,
                    expires_at: row.get("expires_at"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl AuditSink for PostgresStore {
    async fn write_audit_event(&self, event: &AuditEvent) -> anyhow::Result<()> {
        insert_event(&self.pool, event).await
    }

    async fn write_audit_batch(&self, events: &[AuditEvent]) -> anyhow::Result<()> {
        // One transaction per batch: a failed insert rolls the whole
        // application's audit trail entry back, never leaving partial rows.
        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO audit_events (
                    id, bank_id, result_id, rule_key, kind, severity_before, severity_after, recorded_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id)
            .bind(event.bank_id.as_str())
            .bind(event.result_id)
            .bind(event.rule_key.as_str())
            .bind(event.kind.to_string())
            .bind(event.before.to_string())
            .bind(event.after.map(|s| s.to_string()))
            .bind(event.recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_event(pool: &PgPool, event: &AuditEvent) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_events (
            id, bank_id, result_id, rule_key, kind, severity_before, severity_after, recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(event.event_id)
    .bind(event.bank_id.as_str())
    .bind(event.result_id)
    .bind(event.rule_key.as_str())
    .bind(event.kind.to_string())
    .bind(event.before.to_string())
    .bind(event.after.map(|s| s.to_string()))
    .bind(event.recorded_at)
    .execute(pool)
    .await?;

    Ok(())
}
