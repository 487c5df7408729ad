//! Request/response DTOs for the catalog API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use storelink_catalog::preview::{Preview, PreviewItem, PreviewSummary};
use storelink_catalog::worker::WorkerReport;
use storelink_core::TenantId;
use storelink_db::models::{CatalogRun, Listing, RunItem};

/// Tenant scope resolved by the authentication layer and attached to the
/// request as an extension. Authorization itself is an external
/// collaborator; this core trusts the extension.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

/// Uniform success envelope: flattens the payload next to `"ok": true`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Query parameters for the listing lookup.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct ListingsQuery {
    /// Comma-separated internal product ids.
    pub product_ids: String,
}

/// Request to link a product by SKU.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LinkBySkuRequest {
    pub sku: String,
}

/// A listing row as exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: Option<String>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub status: String,
    pub last_price_sync_at: Option<DateTime<Utc>>,
    pub last_stock_sync_at: Option<DateTime<Utc>>,
    pub last_error_code: Option<String>,
    pub last_error_hint: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Listing> for ListingDto {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id,
            product_id: listing.product_id,
            sku: listing.sku.clone(),
            remote_product_id: listing.remote_product_id,
            remote_variation_id: listing.remote_variation_id,
            status: listing.status.clone(),
            last_price_sync_at: listing.last_price_sync_at,
            last_stock_sync_at: listing.last_stock_sync_at,
            last_error_code: listing.last_error_code.clone(),
            last_error_hint: listing.last_error_hint.clone(),
            updated_at: listing.updated_at,
        }
    }
}

/// Response for listing collection lookups.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingsResponse {
    pub rows: Vec<ListingDto>,
}

/// Response for a single listing lookup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingResponse {
    pub listing: Option<ListingDto>,
}

/// Response for link/unlink operations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkStatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_product_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Previews and runs
// ---------------------------------------------------------------------------

/// Caller-tunable options for previews and runs.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SyncOptions {
    /// Price deltas at or below this threshold are skipped with a warning.
    #[serde(default)]
    pub price_tolerance: Option<Decimal>,

    /// Trigger one worker pass right after creating the run.
    #[serde(default)]
    pub run_worker: Option<bool>,

    /// Batch limit for the immediate worker pass.
    #[serde(default)]
    pub worker_limit: Option<i64>,
}

/// Request body for operations targeting internal products.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductTargetsRequest {
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    pub options: SyncOptions,
}

/// Request body for operations targeting storefront products.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RemoteTargetsRequest {
    pub remote_product_ids: Vec<i64>,
    #[serde(default)]
    pub options: SyncOptions,
}

/// One classified preview item.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreviewItemDto {
    pub sku: Option<String>,
    pub product_id: Option<Uuid>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub action: String,
    pub warnings: Vec<String>,
    pub blockers: Vec<String>,
    /// Open field-level diff: field name to `{old, new}`.
    #[schema(value_type = Object)]
    pub diff: JsonValue,
}

impl From<&PreviewItem> for PreviewItemDto {
    fn from(item: &PreviewItem) -> Self {
        Self {
            sku: item.sku.clone(),
            product_id: item.product_id.map(|id| id.into_uuid()),
            remote_product_id: item.remote_product_id,
            remote_variation_id: item.remote_variation_id,
            action: item.action.to_string(),
            warnings: item.warnings.clone(),
            blockers: item.blockers.clone(),
            diff: serde_json::to_value(&item.diff).unwrap_or(JsonValue::Null),
        }
    }
}

/// Preview response: summary plus per-item classification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreviewResponse {
    pub mode: String,
    pub summary: PreviewSummaryDto,
    pub items: Vec<PreviewItemDto>,
}

/// Preview counters.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreviewSummaryDto {
    pub create: i64,
    pub update: i64,
    pub skip: i64,
    pub block: i64,
}

impl From<&PreviewSummary> for PreviewSummaryDto {
    fn from(summary: &PreviewSummary) -> Self {
        Self {
            create: summary.create,
            update: summary.update,
            skip: summary.skip,
            block: summary.block,
        }
    }
}

impl From<&Preview> for PreviewResponse {
    fn from(preview: &Preview) -> Self {
        Self {
            mode: preview.operation.to_string(),
            summary: PreviewSummaryDto::from(&preview.summary),
            items: preview.items.iter().map(PreviewItemDto::from).collect(),
        }
    }
}

/// Response after creating a run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunCreatedResponse {
    pub run_id: Uuid,
    pub summary: PreviewSummaryDto,
    /// Report of the immediate worker pass, when one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub worker: Option<WorkerReport>,
}

/// A run in list/detail responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunDto {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub operation: String,
    pub status: String,
    #[schema(value_type = Object)]
    pub summary: JsonValue,
    pub source_run_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CatalogRun> for RunDto {
    fn from(run: &CatalogRun) -> Self {
        Self {
            id: run.id,
            operation: run.operation.clone(),
            status: run.status.clone(),
            summary: run.summary.clone(),
            source_run_id: run.source_run_id,
            created_at: run.created_at,
            started_at: run.started_at,
            finished_at: run.finished_at,
            updated_at: run.updated_at,
        }
    }
}

/// A run item in detail responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunItemDto {
    pub id: Uuid,
    pub sku: Option<String>,
    pub product_id: Option<Uuid>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub action: String,
    pub status: String,
    #[schema(value_type = Object)]
    pub diff: JsonValue,
    #[schema(value_type = Object)]
    pub warnings: JsonValue,
    #[schema(value_type = Object)]
    pub blockers: JsonValue,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_code: Option<String>,
    pub hint: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&RunItem> for RunItemDto {
    fn from(item: &RunItem) -> Self {
        Self {
            id: item.id,
            sku: item.sku.clone(),
            product_id: item.product_id,
            remote_product_id: item.remote_product_id,
            remote_variation_id: item.remote_variation_id,
            action: item.action.clone(),
            status: item.status.clone(),
            diff: item.diff.clone(),
            warnings: item.warnings.clone(),
            blockers: item.blockers.clone(),
            attempts: item.attempts,
            max_attempts: item.max_attempts,
            error_code: item.error_code.clone(),
            hint: item.hint.clone(),
            last_error_at: item.last_error_at,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Query parameters for listing runs.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct ListRunsQuery {
    /// Maximum results (default 30, max 100).
    #[serde(default = "default_runs_limit")]
    pub limit: i64,
}

fn default_runs_limit() -> i64 {
    30
}

/// Response for the run listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunListResponse {
    pub runs: Vec<RunDto>,
}

/// Response for the run detail view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunDetailResponse {
    pub run: RunDto,
    pub items: Vec<RunItemDto>,
}

/// Response after a retry request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RetryResponse {
    pub run_id: Uuid,
    pub source_run_id: Uuid,
    pub retried_items: usize,
}

/// Response after a cancel request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CancelResponse {
    pub run_id: Uuid,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Worker, health, product search
// ---------------------------------------------------------------------------

/// Request body for an explicit worker pass.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct WorkerRunRequest {
    /// Batch limit (default 25, clamped to 1..=100).
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Response of an explicit worker pass.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkerRunResponse {
    #[schema(value_type = Object)]
    pub worker: WorkerReport,
}

/// Response of a store health probe.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Query parameters for the remote product search passthrough.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct ProductSearchQuery {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

/// One remote product row in search results.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RemoteProductDto {
    pub id: i64,
    pub variation_id: Option<i64>,
    pub sku: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub product_type: String,
    pub status: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&storelink_connector::types::RemoteProduct> for RemoteProductDto {
    fn from(product: &storelink_connector::types::RemoteProduct) -> Self {
        Self {
            id: product.id,
            variation_id: product.variation_id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            product_type: product.product_type.to_string(),
            status: product.status.clone(),
            price: product.regular_price,
            stock_quantity: product.stock_quantity,
            updated_at: product.updated_at,
        }
    }
}

/// Response of the remote product search.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSearchResponse {
    pub rows: Vec<RemoteProductDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_flattens_payload() {
        let body = Envelope::new(CancelResponse {
            run_id: Uuid::nil(),
            status: "canceled".to_string(),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["status"], "canceled");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_sync_options_default() {
        let options: SyncOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(options.price_tolerance.is_none());
        assert!(options.run_worker.is_none());
    }

    #[test]
    fn test_runs_query_default_limit() {
        let query: ListRunsQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.limit, 30);
    }
}
