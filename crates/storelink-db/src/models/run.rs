//! Catalog run model: one row per synchronization attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// The operation class a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOperation {
    /// Push internal products to the storefront.
    Export,
    /// Pull storefront products into the internal catalog.
    Import,
    /// Push prices only.
    SyncPrice,
    /// Push stock levels only.
    SyncStock,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "EXPORT",
            Self::Import => "IMPORT",
            Self::SyncPrice => "SYNC_PRICE",
            Self::SyncStock => "SYNC_STOCK",
        }
    }

    /// Whether this operation targets remote ids rather than internal ids.
    #[must_use]
    pub fn targets_remote(&self) -> bool {
        matches!(self, Self::Import)
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EXPORT" => Ok(Self::Export),
            "IMPORT" => Ok(Self::Import),
            "SYNC_PRICE" => Ok(Self::SyncPrice),
            "SYNC_STOCK" => Ok(Self::SyncStock),
            other => Err(format!("Unknown sync operation: {other}")),
        }
    }
}

/// Lifecycle status of a run.
///
/// `queued → running → {done | error | partial | canceled}`; terminal
/// states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    /// Every item reached a terminal non-failure state.
    Done,
    /// No item succeeded and at least one failed.
    Error,
    /// At least one item succeeded and at least one failed terminally.
    Partial,
    /// Externally aborted before completion.
    Canceled,
}

impl RunStatus {
    /// Check if this status is terminal (run has ended).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Partial | Self::Canceled)
    }

    /// Check if the run can still be canceled.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Partial => "partial",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            "partial" => Ok(Self::Partial),
            "canceled" => Ok(Self::Canceled),
            other => Err(format!("Unknown run status: {other}")),
        }
    }
}

/// Summary counters carried on a run.
///
/// The action counters come from the preview; the status counters are
/// refreshed from item state every time the run is advanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub create: i64,
    #[serde(default)]
    pub update: i64,
    #[serde(default)]
    pub skip: i64,
    #[serde(default)]
    pub block: i64,
    #[serde(default)]
    pub done: i64,
    #[serde(default)]
    pub error: i64,
    #[serde(default)]
    pub dead: i64,
    #[serde(default)]
    pub skipped: i64,
}

impl RunSummary {
    /// Total number of items derived from the action counters.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.create + self.update + self.skip + self.block
    }
}

/// A catalog run row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogRun {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_id: Uuid,
    pub operation: String,
    pub status: String,
    pub summary: JsonValue,
    pub source_run_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRun {
    /// Get the operation enum.
    pub fn operation(&self) -> Option<SyncOperation> {
        self.operation.parse().ok()
    }

    /// Get the status enum.
    pub fn status(&self) -> RunStatus {
        self.status.parse().unwrap_or(RunStatus::Queued)
    }

    /// Get the parsed summary counters.
    pub fn summary(&self) -> RunSummary {
        serde_json::from_value(self.summary.clone()).unwrap_or_default()
    }

    /// Create a new run.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        store_id: Uuid,
        operation: SyncOperation,
        status: RunStatus,
        summary: &RunSummary,
        source_run_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let summary_json = serde_json::to_value(summary).unwrap_or(JsonValue::Null);
        sqlx::query_as(
            r#"
            INSERT INTO catalog_run (
                tenant_id, store_id, operation, status, summary, source_run_id,
                finished_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $7 THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(operation.as_str())
        .bind(status.as_str())
        .bind(summary_json)
        .bind(source_run_id)
        .bind(status.is_terminal())
        .fetch_one(&mut **tx)
        .await
    }

    /// Find a run by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_run
            WHERE id = $1 AND tenant_id = $2 AND store_id = $3
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(store_id)
        .fetch_optional(pool)
        .await
    }

    /// Lock a run row for a status transition.
    ///
    /// Serializes concurrent `advance`/`cancel` calls on the same run.
    pub async fn find_for_update(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        store_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_run
            WHERE id = $1 AND tenant_id = $2 AND store_id = $3
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(store_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// List the most recent runs for a store.
    pub async fn list_by_store(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_run
            WHERE tenant_id = $1 AND store_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Update status and summary inside a transaction.
    ///
    /// Stamps `started_at` on the first transition out of `queued` and
    /// `finished_at` when the new status is terminal.
    pub async fn update_status(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        id: Uuid,
        status: RunStatus,
        summary: &RunSummary,
    ) -> Result<Option<Self>, sqlx::Error> {
        let summary_json = serde_json::to_value(summary).unwrap_or(JsonValue::Null);
        sqlx::query_as(
            r#"
            UPDATE catalog_run
            SET status = $3,
                summary = $4,
                started_at = COALESCE(started_at, CASE WHEN $3 <> 'queued' THEN NOW() END),
                finished_at = CASE WHEN $5 THEN COALESCE(finished_at, NOW()) END,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status.as_str())
        .bind(summary_json)
        .bind(status.is_terminal())
        .fetch_optional(&mut **tx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_roundtrip() {
        for op in [
            SyncOperation::Export,
            SyncOperation::Import,
            SyncOperation::SyncPrice,
            SyncOperation::SyncStock,
        ] {
            let s = op.to_string();
            let parsed: SyncOperation = s.parse().unwrap();
            assert_eq!(op, parsed);
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            RunStatus::Queued,
            RunStatus::Running,
            RunStatus::Done,
            RunStatus::Error,
            RunStatus::Partial,
            RunStatus::Canceled,
        ] {
            let s = status.to_string();
            let parsed: RunStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_status_terminal() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Done.is_terminal());
        assert!(RunStatus::Error.is_terminal());
        assert!(RunStatus::Partial.is_terminal());
        assert!(RunStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_status_can_cancel() {
        assert!(RunStatus::Queued.can_cancel());
        assert!(RunStatus::Running.can_cancel());
        assert!(!RunStatus::Done.can_cancel());
        assert!(!RunStatus::Partial.can_cancel());
        assert!(!RunStatus::Canceled.can_cancel());
    }

    #[test]
    fn test_summary_total_uses_action_counters() {
        let summary = RunSummary {
            create: 2,
            update: 3,
            skip: 1,
            block: 1,
            done: 4,
            ..Default::default()
        };
        assert_eq!(summary.total(), 7);
    }

    #[test]
    fn test_summary_deserializes_missing_fields() {
        let summary: RunSummary = serde_json::from_value(serde_json::json!({
            "create": 1, "update": 2
        }))
        .unwrap();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.update, 2);
        assert_eq!(summary.dead, 0);
    }

    #[test]
    fn test_only_import_targets_remote() {
        assert!(SyncOperation::Import.targets_remote());
        assert!(!SyncOperation::Export.targets_remote());
        assert!(!SyncOperation::SyncPrice.targets_remote());
    }
}
