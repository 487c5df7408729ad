//! Store health and remote product search handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::warn;
use uuid::Uuid;

use storelink_connector::traits::{Connector, ProductSearch};
use storelink_db::models::Store;

use crate::error::{CatalogApiError, Result};
use crate::models::{
    Envelope, HealthResponse, ProductSearchQuery, ProductSearchResponse, RemoteProductDto,
    TenantContext,
};
use crate::router::CatalogApiState;

/// `GET /stores/:store_id/health`
///
/// Probes the storefront with a lightweight request and persists the
/// outcome on the store row.
pub async fn store_health(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Envelope<HealthResponse>>> {
    let connector = state
        .provider
        .connector_for_store(ctx.tenant_id, storelink_core::StoreId::from_uuid(store_id))
        .await?;

    let probe = connector.test_connection().await;
    let healthy = probe.is_ok();
    let hint = probe.err().map(|e| e.to_string());

    if let Err(e) = Store::record_healthcheck(
        &state.pool,
        ctx.tenant_id.into_uuid(),
        store_id,
        healthy,
    )
    .await
    {
        warn!(error = %e, "failed to persist healthcheck result");
    }

    Ok(Json(Envelope::new(HealthResponse {
        status: if healthy { "ok" } else { "error" }.to_string(),
        hint,
    })))
}

/// `GET /stores/:store_id/products/search`
///
/// Passthrough to the storefront catalog search, used by callers to pick
/// import targets.
pub async fn search_products(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ProductSearchQuery>,
) -> Result<Json<Envelope<ProductSearchResponse>>> {
    if query.query.trim().is_empty() {
        return Err(CatalogApiError::validation("query must not be empty"));
    }

    let connector = state
        .provider
        .connector_for_store(ctx.tenant_id, storelink_core::StoreId::from_uuid(store_id))
        .await?;

    let rows = connector
        .search_products(query.query.trim(), query.page, query.per_page)
        .await?;

    Ok(Json(Envelope::new(ProductSearchResponse {
        rows: rows.iter().map(RemoteProductDto::from).collect(),
    })))
}
