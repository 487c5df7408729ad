//! Preview and run-creation handlers for the four operation classes.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use storelink_catalog::preview::{DiffOptions, Preview};
use storelink_core::{ProductId, StoreId, TenantId};
use storelink_db::models::SyncOperation;

use crate::error::Result;
use crate::models::{
    Envelope, PreviewResponse, PreviewSummaryDto, ProductTargetsRequest, RemoteTargetsRequest,
    RunCreatedResponse, SyncOptions, TenantContext,
};
use crate::router::CatalogApiState;

const DEFAULT_WORKER_LIMIT: i64 = 25;

fn diff_options(state: &CatalogApiState, options: &SyncOptions) -> DiffOptions {
    DiffOptions {
        price_tolerance: options
            .price_tolerance
            .unwrap_or(state.config.price_tolerance),
    }
}

async fn compute_product_preview(
    state: &CatalogApiState,
    tenant_id: TenantId,
    store_id: StoreId,
    operation: SyncOperation,
    body: &ProductTargetsRequest,
) -> Result<Preview> {
    let targets: Vec<ProductId> = body
        .product_ids
        .iter()
        .copied()
        .map(ProductId::from_uuid)
        .collect();
    Ok(state
        .preview_service
        .preview(
            tenant_id,
            store_id,
            operation,
            &targets,
            &[],
            &diff_options(state, &body.options),
        )
        .await?)
}

async fn compute_remote_preview(
    state: &CatalogApiState,
    tenant_id: TenantId,
    store_id: StoreId,
    body: &RemoteTargetsRequest,
) -> Result<Preview> {
    Ok(state
        .preview_service
        .preview(
            tenant_id,
            store_id,
            SyncOperation::Import,
            &[],
            &body.remote_product_ids,
            &diff_options(state, &body.options),
        )
        .await?)
}

/// Create a run from a freshly computed preview, optionally triggering an
/// immediate worker pass for faster feedback.
async fn create_run_response(
    state: &CatalogApiState,
    tenant_id: TenantId,
    store_id: StoreId,
    preview: &Preview,
    options: &SyncOptions,
) -> Result<RunCreatedResponse> {
    let run = state
        .orchestrator
        .create_run(
            tenant_id,
            store_id,
            preview,
            state.config.max_attempts,
            None,
        )
        .await?;

    let worker = if options.run_worker.unwrap_or(false) && preview.has_actionable_items() {
        let limit = options.worker_limit.unwrap_or(DEFAULT_WORKER_LIMIT);
        Some(state.worker.process_batch(tenant_id, store_id, limit).await?)
    } else {
        None
    };

    Ok(RunCreatedResponse {
        run_id: run.id,
        summary: PreviewSummaryDto::from(&preview.summary),
        worker,
    })
}

/// `POST /stores/:store_id/catalog/preview/export`
pub async fn preview_export(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<ProductTargetsRequest>,
) -> Result<Json<Envelope<PreviewResponse>>> {
    let preview = compute_product_preview(
        &state,
        ctx.tenant_id,
        StoreId::from_uuid(store_id),
        SyncOperation::Export,
        &body,
    )
    .await?;
    Ok(Json(Envelope::new(PreviewResponse::from(&preview))))
}

/// `POST /stores/:store_id/catalog/preview/sync-price`
pub async fn preview_sync_price(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<ProductTargetsRequest>,
) -> Result<Json<Envelope<PreviewResponse>>> {
    let preview = compute_product_preview(
        &state,
        ctx.tenant_id,
        StoreId::from_uuid(store_id),
        SyncOperation::SyncPrice,
        &body,
    )
    .await?;
    Ok(Json(Envelope::new(PreviewResponse::from(&preview))))
}

/// `POST /stores/:store_id/catalog/preview/sync-stock`
pub async fn preview_sync_stock(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<ProductTargetsRequest>,
) -> Result<Json<Envelope<PreviewResponse>>> {
    let preview = compute_product_preview(
        &state,
        ctx.tenant_id,
        StoreId::from_uuid(store_id),
        SyncOperation::SyncStock,
        &body,
    )
    .await?;
    Ok(Json(Envelope::new(PreviewResponse::from(&preview))))
}

/// `POST /stores/:store_id/catalog/preview/import`
pub async fn preview_import(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<RemoteTargetsRequest>,
) -> Result<Json<Envelope<PreviewResponse>>> {
    let preview =
        compute_remote_preview(&state, ctx.tenant_id, StoreId::from_uuid(store_id), &body).await?;
    Ok(Json(Envelope::new(PreviewResponse::from(&preview))))
}

/// `POST /stores/:store_id/catalog/run/export`
pub async fn run_export(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<ProductTargetsRequest>,
) -> Result<Json<Envelope<RunCreatedResponse>>> {
    let store_id = StoreId::from_uuid(store_id);
    let preview = compute_product_preview(
        &state,
        ctx.tenant_id,
        store_id,
        SyncOperation::Export,
        &body,
    )
    .await?;
    let response =
        create_run_response(&state, ctx.tenant_id, store_id, &preview, &body.options).await?;
    Ok(Json(Envelope::new(response)))
}

/// `POST /stores/:store_id/catalog/run/sync-price`
pub async fn run_sync_price(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<ProductTargetsRequest>,
) -> Result<Json<Envelope<RunCreatedResponse>>> {
    let store_id = StoreId::from_uuid(store_id);
    let preview = compute_product_preview(
        &state,
        ctx.tenant_id,
        store_id,
        SyncOperation::SyncPrice,
        &body,
    )
    .await?;
    let response =
        create_run_response(&state, ctx.tenant_id, store_id, &preview, &body.options).await?;
    Ok(Json(Envelope::new(response)))
}

/// `POST /stores/:store_id/catalog/run/sync-stock`
pub async fn run_sync_stock(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<ProductTargetsRequest>,
) -> Result<Json<Envelope<RunCreatedResponse>>> {
    let store_id = StoreId::from_uuid(store_id);
    let preview = compute_product_preview(
        &state,
        ctx.tenant_id,
        store_id,
        SyncOperation::SyncStock,
        &body,
    )
    .await?;
    let response =
        create_run_response(&state, ctx.tenant_id, store_id, &preview, &body.options).await?;
    Ok(Json(Envelope::new(response)))
}

/// `POST /stores/:store_id/catalog/run/import`
pub async fn run_import(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<RemoteTargetsRequest>,
) -> Result<Json<Envelope<RunCreatedResponse>>> {
    let store_id = StoreId::from_uuid(store_id);
    let preview = compute_remote_preview(&state, ctx.tenant_id, store_id, &body).await?;
    let response =
        create_run_response(&state, ctx.tenant_id, store_id, &preview, &body.options).await?;
    Ok(Json(Envelope::new(response)))
}
