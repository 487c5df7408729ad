//! Run inspection, retry and cancellation handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use storelink_core::{RunId, StoreId};

use crate::error::Result;
use crate::models::{
    CancelResponse, Envelope, ListRunsQuery, RetryResponse, RunDetailResponse, RunDto, RunItemDto,
    RunListResponse, TenantContext,
};
use crate::router::CatalogApiState;

/// `GET /stores/:store_id/runs`
pub async fn list_runs(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Envelope<RunListResponse>>> {
    let runs = state
        .orchestrator
        .list_runs(ctx.tenant_id, StoreId::from_uuid(store_id), query.limit)
        .await?;

    Ok(Json(Envelope::new(RunListResponse {
        runs: runs.iter().map(RunDto::from).collect(),
    })))
}

/// `GET /stores/:store_id/runs/:run_id`
pub async fn get_run(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path((store_id, run_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<RunDetailResponse>>> {
    let (run, items) = state
        .orchestrator
        .get_run_with_items(
            ctx.tenant_id,
            StoreId::from_uuid(store_id),
            RunId::from_uuid(run_id),
        )
        .await?;

    Ok(Json(Envelope::new(RunDetailResponse {
        run: RunDto::from(&run),
        items: items.iter().map(RunItemDto::from).collect(),
    })))
}

/// `POST /stores/:store_id/runs/:run_id/retry-failed`
pub async fn retry_failed(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path((store_id, run_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<RetryResponse>>> {
    let outcome = state
        .retry_manager
        .retry_failed(
            ctx.tenant_id,
            StoreId::from_uuid(store_id),
            RunId::from_uuid(run_id),
        )
        .await?;

    Ok(Json(Envelope::new(RetryResponse {
        run_id: outcome.new_run.id,
        source_run_id: outcome.source_run_id,
        retried_items: outcome.retried_items,
    })))
}

/// `POST /stores/:store_id/runs/:run_id/cancel`
pub async fn cancel_run(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path((store_id, run_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<CancelResponse>>> {
    let run = state
        .orchestrator
        .cancel_run(
            ctx.tenant_id,
            StoreId::from_uuid(store_id),
            RunId::from_uuid(run_id),
        )
        .await?;

    Ok(Json(Envelope::new(CancelResponse {
        run_id: run.id,
        status: run.status,
    })))
}
