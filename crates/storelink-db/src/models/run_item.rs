//! Run item model: one unit of work per product within a run.
//!
//! Items are created in bulk when a run is created, claimed atomically by
//! the execution worker (`FOR UPDATE SKIP LOCKED`), and immutable once
//! they reach a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// The classified action for an item, fixed at preview time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemAction {
    Create,
    Update,
    Skip,
    Block,
}

impl ItemAction {
    /// Whether the worker ever executes this action.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Skip => "SKIP",
            Self::Block => "BLOCK",
        }
    }
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "SKIP" => Ok(Self::Skip),
            "BLOCK" => Ok(Self::Block),
            other => Err(format!("Unknown item action: {other}")),
        }
    }
}

/// Execution status of a run item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Queued,
    Running,
    Done,
    Error,
    /// Retry budget exhausted; only a new retry run may attempt it again.
    Dead,
    /// Finalized without execution (SKIP/BLOCK actions, canceled runs).
    Skipped,
}

impl ItemStatus {
    /// Check if this status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Dead | Self::Skipped)
    }

    /// Check if this status counts as a terminal failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Dead)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::Dead => "DEAD",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "DONE" => Ok(Self::Done),
            "ERROR" => Ok(Self::Error),
            "DEAD" => Ok(Self::Dead),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(format!("Unknown item status: {other}")),
        }
    }
}

/// Per-status item counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemStatusCounts {
    pub queued: i64,
    pub running: i64,
    pub done: i64,
    pub error: i64,
    pub dead: i64,
    pub skipped: i64,
}

impl ItemStatusCounts {
    /// Total number of items.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.queued + self.running + self.done + self.error + self.dead + self.skipped
    }

    /// Items that still need worker attention.
    #[must_use]
    pub fn in_flight(&self) -> i64 {
        self.queued + self.running
    }

    /// Items that failed terminally.
    #[must_use]
    pub fn failures(&self) -> i64 {
        self.error + self.dead
    }
}

/// Input for bulk item creation.
#[derive(Debug, Clone)]
pub struct NewRunItem {
    pub sku: Option<String>,
    pub product_id: Option<Uuid>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub action: ItemAction,
    pub status: ItemStatus,
    pub diff: JsonValue,
    pub warnings: Vec<String>,
    pub blockers: Vec<String>,
    pub max_attempts: i32,
}

/// A run item row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RunItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_id: Uuid,
    pub run_id: Uuid,
    pub sku: Option<String>,
    pub product_id: Option<Uuid>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub action: String,
    pub status: String,
    pub diff: JsonValue,
    pub warnings: JsonValue,
    pub blockers: JsonValue,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub error_code: Option<String>,
    pub hint: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunItem {
    /// Get the action enum.
    pub fn action(&self) -> ItemAction {
        self.action.parse().unwrap_or(ItemAction::Block)
    }

    /// Get the status enum.
    pub fn status(&self) -> ItemStatus {
        self.status.parse().unwrap_or(ItemStatus::Error)
    }

    /// Bulk-insert the items of a freshly created run.
    pub async fn create_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        store_id: Uuid,
        run_id: Uuid,
        items: &[NewRunItem],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0u64;
        for item in items {
            let warnings = serde_json::to_value(&item.warnings).unwrap_or(JsonValue::Null);
            let blockers = serde_json::to_value(&item.blockers).unwrap_or(JsonValue::Null);
            sqlx::query(
                r#"
                INSERT INTO catalog_run_item (
                    tenant_id, store_id, run_id, sku, product_id,
                    remote_product_id, remote_variation_id,
                    action, status, diff, warnings, blockers, max_attempts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(tenant_id)
            .bind(store_id)
            .bind(run_id)
            .bind(&item.sku)
            .bind(item.product_id)
            .bind(item.remote_product_id)
            .bind(item.remote_variation_id)
            .bind(item.action.as_str())
            .bind(item.status.as_str())
            .bind(&item.diff)
            .bind(warnings)
            .bind(blockers)
            .bind(item.max_attempts)
            .execute(&mut **tx)
            .await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Atomically claim up to `limit` queued items for a store, oldest
    /// first across runs.
    ///
    /// The inner `FOR UPDATE SKIP LOCKED` select makes this safe under
    /// concurrent workers: an item is claimed by exactly one of them.
    /// Items whose backoff window has not elapsed are left alone.
    pub async fn claim_batch(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE catalog_run_item
            SET status = 'RUNNING', updated_at = NOW()
            WHERE id IN (
                SELECT id FROM catalog_run_item
                WHERE tenant_id = $1 AND store_id = $2
                  AND status = 'QUEUED'
                  AND action IN ('CREATE', 'UPDATE')
                  AND (next_attempt_at IS NULL OR next_attempt_at <= NOW())
                ORDER BY created_at
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Finalize a claimed item as successfully executed.
    pub async fn mark_done(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        id: Uuid,
        remote_product_id: Option<i64>,
        remote_variation_id: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE catalog_run_item
            SET status = 'DONE',
                attempts = attempts + 1,
                remote_product_id = COALESCE($3, remote_product_id),
                remote_variation_id = COALESCE($4, remote_variation_id),
                error_code = NULL,
                hint = NULL,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = 'RUNNING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(remote_product_id)
        .bind(remote_variation_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Return a claimed item to the queue after a transient failure.
    pub async fn requeue(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        next_attempt_at: DateTime<Utc>,
        error_code: &str,
        hint: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE catalog_run_item
            SET status = 'QUEUED',
                attempts = attempts + 1,
                next_attempt_at = $3,
                error_code = $4,
                hint = $5,
                last_error_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = 'RUNNING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(next_attempt_at)
        .bind(error_code)
        .bind(hint)
        .fetch_optional(pool)
        .await
    }

    /// Finalize a claimed item as failed.
    ///
    /// `status` must be `ERROR` (permanent rejection) or `DEAD` (retry
    /// budget exhausted).
    pub async fn mark_failed(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        status: ItemStatus,
        error_code: &str,
        hint: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        debug_assert!(status.is_failure());
        sqlx::query_as(
            r#"
            UPDATE catalog_run_item
            SET status = $3,
                attempts = attempts + 1,
                error_code = $4,
                hint = $5,
                last_error_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = 'RUNNING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status.as_str())
        .bind(error_code)
        .bind(hint)
        .fetch_optional(pool)
        .await
    }

    /// List all items of a run, oldest first.
    pub async fn list_by_run(
        pool: &PgPool,
        tenant_id: Uuid,
        run_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_run_item
            WHERE tenant_id = $1 AND run_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .bind(run_id)
        .fetch_all(pool)
        .await
    }

    /// List the terminally failed items of a run (`ERROR` or `DEAD`).
    pub async fn list_failed(
        pool: &PgPool,
        tenant_id: Uuid,
        run_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_run_item
            WHERE tenant_id = $1 AND run_id = $2 AND status IN ('ERROR', 'DEAD')
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .bind(run_id)
        .fetch_all(pool)
        .await
    }

    /// Per-status counts for one run, inside the advance transaction.
    pub async fn counts_for_run(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        run_id: Uuid,
    ) -> Result<ItemStatusCounts, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM catalog_run_item
            WHERE tenant_id = $1 AND run_id = $2
            GROUP BY status
            "#,
        )
        .bind(tenant_id)
        .bind(run_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut counts = ItemStatusCounts::default();
        for (status, count) in rows {
            match status.parse::<ItemStatus>() {
                Ok(ItemStatus::Queued) => counts.queued = count,
                Ok(ItemStatus::Running) => counts.running = count,
                Ok(ItemStatus::Done) => counts.done = count,
                Ok(ItemStatus::Error) => counts.error = count,
                Ok(ItemStatus::Dead) => counts.dead = count,
                Ok(ItemStatus::Skipped) => counts.skipped = count,
                Err(_) => {}
            }
        }
        Ok(counts)
    }

    /// Finalize every still-queued item of a run as `SKIPPED` (cancel
    /// path). Items already `RUNNING` are left to finish.
    pub async fn skip_queued(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        run_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_run_item
            SET status = 'SKIPPED', updated_at = NOW()
            WHERE tenant_id = $1 AND run_id = $2 AND status = 'QUEUED'
            "#,
        )
        .bind(tenant_id)
        .bind(run_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        for action in [
            ItemAction::Create,
            ItemAction::Update,
            ItemAction::Skip,
            ItemAction::Block,
        ] {
            let s = action.to_string();
            let parsed: ItemAction = s.parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn test_only_create_update_actionable() {
        assert!(ItemAction::Create.is_actionable());
        assert!(ItemAction::Update.is_actionable());
        assert!(!ItemAction::Skip.is_actionable());
        assert!(!ItemAction::Block.is_actionable());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ItemStatus::Queued,
            ItemStatus::Running,
            ItemStatus::Done,
            ItemStatus::Error,
            ItemStatus::Dead,
            ItemStatus::Skipped,
        ] {
            let s = status.to_string();
            let parsed: ItemStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_status_terminality() {
        assert!(!ItemStatus::Queued.is_terminal());
        assert!(!ItemStatus::Running.is_terminal());
        assert!(ItemStatus::Done.is_terminal());
        assert!(ItemStatus::Error.is_terminal());
        assert!(ItemStatus::Dead.is_terminal());
        assert!(ItemStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_failure_statuses() {
        assert!(ItemStatus::Error.is_failure());
        assert!(ItemStatus::Dead.is_failure());
        assert!(!ItemStatus::Done.is_failure());
        assert!(!ItemStatus::Skipped.is_failure());
    }

    #[test]
    fn test_counts_arithmetic() {
        let counts = ItemStatusCounts {
            queued: 2,
            running: 1,
            done: 3,
            error: 1,
            dead: 1,
            skipped: 2,
        };
        assert_eq!(counts.total(), 10);
        assert_eq!(counts.in_flight(), 3);
        assert_eq!(counts.failures(), 2);
    }
}
