//! Listing registry handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use storelink_core::{CoreError, ProductId, StoreId};

use crate::error::{CatalogApiError, Result};
use crate::models::{
    Envelope, LinkBySkuRequest, LinkStatusResponse, ListingDto, ListingResponse, ListingsQuery,
    ListingsResponse, TenantContext,
};
use crate::router::CatalogApiState;

/// `GET /stores/:store_id/listings?product_ids=...`
pub async fn list_listings(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<Envelope<ListingsResponse>>> {
    let product_ids = parse_product_ids(&query.product_ids)?;
    let listings = state
        .registry
        .get_by_products(ctx.tenant_id, StoreId::from_uuid(store_id), &product_ids)
        .await?;

    Ok(Json(Envelope::new(ListingsResponse {
        rows: listings.iter().map(ListingDto::from).collect(),
    })))
}

/// `GET /stores/:store_id/listings/:product_id`
pub async fn get_listing(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<ListingResponse>>> {
    let listing = state
        .registry
        .get_by_product(
            ctx.tenant_id,
            StoreId::from_uuid(store_id),
            ProductId::from_uuid(product_id),
        )
        .await?;

    Ok(Json(Envelope::new(ListingResponse {
        listing: listing.as_ref().map(ListingDto::from),
    })))
}

/// `POST /stores/:store_id/listings/:product_id/link`
pub async fn link_listing(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<LinkBySkuRequest>,
) -> Result<Json<Envelope<LinkStatusResponse>>> {
    let result = state
        .registry
        .link_by_sku(
            ctx.tenant_id,
            StoreId::from_uuid(store_id),
            ProductId::from_uuid(product_id),
            &body.sku,
        )
        .await?;

    Ok(Json(Envelope::new(LinkStatusResponse {
        status: result.status.to_string(),
        conflicting_product_id: result.conflicting_product_id.map(ProductId::into_uuid),
    })))
}

/// `POST /stores/:store_id/listings/:product_id/unlink`
pub async fn unlink_listing(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<LinkStatusResponse>>> {
    let status = state
        .registry
        .unlink(
            ctx.tenant_id,
            StoreId::from_uuid(store_id),
            ProductId::from_uuid(product_id),
        )
        .await?;

    Ok(Json(Envelope::new(LinkStatusResponse {
        status: status.to_string(),
        conflicting_product_id: None,
    })))
}

/// Parse a comma-separated product id list.
fn parse_product_ids(raw: &str) -> Result<Vec<ProductId>> {
    let ids: Vec<ProductId> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ProductId>()
                .map_err(|e| CoreError::validation("product_ids", e.to_string()))
        })
        .collect::<std::result::Result<_, _>>()
        .map_err(CatalogApiError::from)?;
    if ids.is_empty() {
        return Err(CatalogApiError::validation(
            "product_ids must contain at least one id",
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_product_ids(&format!("{a}, {b},")).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].into_uuid(), a);
    }

    #[test]
    fn test_parse_product_ids_rejects_empty() {
        assert!(parse_product_ids("  ,,").is_err());
    }

    #[test]
    fn test_parse_product_ids_rejects_garbage() {
        assert!(parse_product_ids("not-a-uuid").is_err());
    }
}
