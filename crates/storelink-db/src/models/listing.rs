//! Catalog listing model: the durable link between an internal product and
//! its counterpart on the storefront.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Reconciliation status of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// No remote counterpart is recorded.
    #[default]
    Unlinked,
    /// Internal product and remote product are linked and believed valid.
    Linked,
    /// Two products map to the same counterpart; needs manual resolution.
    Conflict,
    /// The last link or sync attempt failed terminally.
    Error,
}

impl ListingStatus {
    /// Whether sync operations may target this listing.
    #[must_use]
    pub fn is_syncable(&self) -> bool {
        matches!(self, Self::Linked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlinked => "unlinked",
            Self::Linked => "linked",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unlinked" => Ok(Self::Unlinked),
            "linked" => Ok(Self::Linked),
            "conflict" => Ok(Self::Conflict),
            "error" => Ok(Self::Error),
            other => Err(format!("Unknown listing status: {other}")),
        }
    }
}

/// A catalog listing row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub sku: Option<String>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub status: String,
    pub last_price_sync_at: Option<DateTime<Utc>>,
    pub last_stock_sync_at: Option<DateTime<Utc>>,
    pub last_error_code: Option<String>,
    pub last_error_hint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Get the status enum.
    pub fn status(&self) -> ListingStatus {
        self.status.parse().unwrap_or(ListingStatus::Error)
    }

    /// Find the listing for one internal product.
    pub async fn find_by_product(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_listing
            WHERE tenant_id = $1 AND store_id = $2 AND product_id = $3
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await
    }

    /// Find the listings for a set of internal products.
    pub async fn find_by_products(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_listing
            WHERE tenant_id = $1 AND store_id = $2 AND product_id = ANY($3)
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(product_ids)
        .fetch_all(pool)
        .await
    }

    /// Find listings already pointing at a remote product/variation pair.
    pub async fn find_by_remote(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        remote_product_id: i64,
        remote_variation_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_listing
            WHERE tenant_id = $1 AND store_id = $2
              AND remote_product_id = $3
              AND remote_variation_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(remote_product_id)
        .bind(remote_variation_id)
        .fetch_all(pool)
        .await
    }

    /// Find listings by a set of remote product ids (import previews).
    pub async fn find_by_remote_products(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        remote_product_ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM catalog_listing
            WHERE tenant_id = $1 AND store_id = $2 AND remote_product_id = ANY($3)
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(remote_product_ids)
        .fetch_all(pool)
        .await
    }

    /// Create or update the listing for a product with an explicit state.
    ///
    /// This is the single write path for link operations; the execution
    /// worker uses [`Listing::record_synced`] inside its item transaction
    /// instead.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        product_id: Uuid,
        sku: Option<&str>,
        remote_product_id: Option<i64>,
        remote_variation_id: Option<i64>,
        status: ListingStatus,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO catalog_listing (
                tenant_id, store_id, product_id, sku,
                remote_product_id, remote_variation_id, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (store_id, product_id) DO UPDATE
            SET sku = EXCLUDED.sku,
                remote_product_id = EXCLUDED.remote_product_id,
                remote_variation_id = EXCLUDED.remote_variation_id,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(product_id)
        .bind(sku)
        .bind(remote_product_id)
        .bind(remote_variation_id)
        .bind(status.as_str())
        .fetch_one(pool)
        .await
    }

    /// Unlink a product: clear remote ids, keep the row for audit history.
    pub async fn unlink(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE catalog_listing
            SET status = 'unlinked',
                remote_product_id = NULL,
                remote_variation_id = NULL,
                last_error_code = NULL,
                last_error_hint = NULL,
                updated_at = NOW()
            WHERE tenant_id = $1 AND store_id = $2 AND product_id = $3
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await
    }

    /// Record a successful remote write, inside the worker's item
    /// transaction. Links the remote ids (CREATE) and refreshes the sync
    /// timestamp for the given field family.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_synced(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        store_id: Uuid,
        product_id: Uuid,
        sku: Option<&str>,
        remote_product_id: i64,
        remote_variation_id: Option<i64>,
        touch_price: bool,
        touch_stock: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO catalog_listing (
                tenant_id, store_id, product_id, sku,
                remote_product_id, remote_variation_id, status,
                last_price_sync_at, last_stock_sync_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, 'linked',
                CASE WHEN $7 THEN NOW() END,
                CASE WHEN $8 THEN NOW() END
            )
            ON CONFLICT (store_id, product_id) DO UPDATE
            SET sku = COALESCE(EXCLUDED.sku, catalog_listing.sku),
                remote_product_id = EXCLUDED.remote_product_id,
                remote_variation_id = EXCLUDED.remote_variation_id,
                status = 'linked',
                last_price_sync_at = CASE WHEN $7 THEN NOW()
                                          ELSE catalog_listing.last_price_sync_at END,
                last_stock_sync_at = CASE WHEN $8 THEN NOW()
                                          ELSE catalog_listing.last_stock_sync_at END,
                last_error_code = NULL,
                last_error_hint = NULL,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(product_id)
        .bind(sku)
        .bind(remote_product_id)
        .bind(remote_variation_id)
        .bind(touch_price)
        .bind(touch_stock)
        .fetch_one(&mut **tx)
        .await
    }

    /// Record a terminal failure against the listing.
    pub async fn record_error(
        pool: &PgPool,
        tenant_id: Uuid,
        store_id: Uuid,
        product_id: Uuid,
        error_code: &str,
        hint: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE catalog_listing
            SET status = 'error',
                last_error_code = $4,
                last_error_hint = $5,
                updated_at = NOW()
            WHERE tenant_id = $1 AND store_id = $2 AND product_id = $3
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(product_id)
        .bind(error_code)
        .bind(hint)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ListingStatus::Unlinked,
            ListingStatus::Linked,
            ListingStatus::Conflict,
            ListingStatus::Error,
        ] {
            let s = status.to_string();
            let parsed: ListingStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_only_linked_is_syncable() {
        assert!(ListingStatus::Linked.is_syncable());
        assert!(!ListingStatus::Unlinked.is_syncable());
        assert!(!ListingStatus::Conflict.is_syncable());
        assert!(!ListingStatus::Error.is_syncable());
    }
}
