//! Internal catalog product read model.
//!
//! The product domain owns this table. The sync engine reads it to compute
//! previews and to source export payloads; the only writes from this crate
//! happen on IMPORT runs, where remote products are materialized locally.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// An internal catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub price: Option<Decimal>,
    pub stock: i32,
    pub product_type: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product from an imported remote record.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub price: Option<Decimal>,
    pub stock: i32,
}

/// Partial update applied on IMPORT runs.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
}

impl Product {
    /// Fetch products by id, skipping soft-deleted rows.
    pub async fn find_by_ids(
        pool: &PgPool,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM product
            WHERE tenant_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Find a product by SKU.
    pub async fn find_by_sku(
        pool: &PgPool,
        tenant_id: Uuid,
        sku: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM product
            WHERE tenant_id = $1 AND sku = $2 AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(sku)
        .fetch_optional(pool)
        .await
    }

    /// Insert a product materialized from an imported remote record.
    ///
    /// Runs inside the worker's item transaction.
    pub async fn insert_imported(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        input: &NewProduct,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO product (tenant_id, sku, name, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(input.price)
        .bind(input.stock)
        .fetch_one(&mut **tx)
        .await
    }

    /// Apply an import patch to an existing product.
    pub async fn apply_patch(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        tenant_id: Uuid,
        id: Uuid,
        patch: &ProductPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE product
            SET name = COALESCE($3, name),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&patch.name)
        .bind(patch.price)
        .bind(patch.stock)
        .fetch_optional(&mut **tx)
        .await
    }
}
