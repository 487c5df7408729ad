//! Sync log model: structured per-item operator diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One sync log row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_id: Uuid,
    pub run_id: Option<Uuid>,
    pub run_item_id: Option<Uuid>,
    pub level: String,
    pub message: String,
    pub meta: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Append a log entry. Best-effort callers ignore the result.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        run_id: Option<Uuid>,
        run_item_id: Option<Uuid>,
        level: LogLevel,
        message: &str,
        meta: JsonValue,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO catalog_sync_log (
                tenant_id, store_id, run_id, run_item_id, level, message, meta
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(run_id)
        .bind(run_item_id)
        .bind(level.to_string())
        .bind(message)
        .bind(meta)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Most recent entries for a store.
    pub async fn list_recent(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_sync_log
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
}
