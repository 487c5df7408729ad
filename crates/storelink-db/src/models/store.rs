//! Connected storefront store model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Operational status of a connected store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// Store is reachable and usable.
    Active,
    /// Last health probe failed; sync operations are refused.
    Error,
    /// Store has been disabled by an operator.
    Disabled,
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Error => write!(f, "error"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for StoreStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "error" => Ok(Self::Error),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!("Unknown store status: {other}")),
        }
    }
}

/// A connected WooCommerce store.
///
/// Credential columns hold opaque values; encryption and key management
/// are owned by the secrets layer outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Store {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub base_url: String,
    pub auth_mode: String,
    pub status: String,
    #[serde(skip_serializing)]
    pub consumer_key: String,
    #[serde(skip_serializing)]
    pub consumer_secret: String,
    pub last_healthcheck_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Get the status enum.
    pub fn status(&self) -> StoreStatus {
        self.status.parse().unwrap_or(StoreStatus::Error)
    }

    /// Whether the store accepts sync operations.
    pub fn is_active(&self) -> bool {
        self.status() == StoreStatus::Active
    }

    /// Find a store by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM woo_store
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    /// List stores for a tenant.
    pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM woo_store
            WHERE tenant_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Record the outcome of a health probe.
    pub async fn record_healthcheck(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        healthy: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE woo_store
            SET last_healthcheck_at = NOW(),
                status = CASE WHEN $3 THEN 'active' ELSE 'error' END,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status <> 'disabled'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(healthy)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [StoreStatus::Active, StoreStatus::Error, StoreStatus::Disabled] {
            let s = status.to_string();
            let parsed: StoreStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_unknown_status_is_error() {
        assert!("unknown".parse::<StoreStatus>().is_err());
    }
}
