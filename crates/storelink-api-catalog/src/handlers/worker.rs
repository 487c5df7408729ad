//! Worker trigger handler.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use storelink_core::StoreId;

use crate::error::Result;
use crate::models::{Envelope, TenantContext, WorkerRunRequest, WorkerRunResponse};
use crate::router::CatalogApiState;

const DEFAULT_WORKER_LIMIT: i64 = 25;

/// `POST /stores/:store_id/worker/run`
///
/// Process up to `limit` queued items now. Also the endpoint external
/// schedulers call periodically.
pub async fn run_worker(
    State(state): State<CatalogApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<WorkerRunRequest>,
) -> Result<Json<Envelope<WorkerRunResponse>>> {
    let limit = body.limit.unwrap_or(DEFAULT_WORKER_LIMIT);
    let report = state
        .worker
        .process_batch(ctx.tenant_id, StoreId::from_uuid(store_id), limit)
        .await?;

    Ok(Json(Envelope::new(WorkerRunResponse { worker: report })))
}
