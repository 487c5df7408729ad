//! Router configuration for the catalog API.

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

use storelink_catalog::{
    CatalogConfig, CatalogWorker, ConnectorProvider, ListingRegistry, PreviewService,
    RetryManager, RunOrchestrator,
};

use crate::handlers;

/// Shared state for catalog API handlers.
#[derive(Clone)]
pub struct CatalogApiState {
    pub pool: PgPool,
    pub config: CatalogConfig,
    pub provider: Arc<dyn ConnectorProvider>,
    pub registry: Arc<ListingRegistry>,
    pub preview_service: Arc<PreviewService>,
    pub orchestrator: Arc<RunOrchestrator>,
    pub worker: Arc<CatalogWorker>,
    pub retry_manager: Arc<RetryManager>,
}

impl CatalogApiState {
    /// Wire the engine services onto one pool and connector provider.
    pub fn new(pool: PgPool, provider: Arc<dyn ConnectorProvider>, config: CatalogConfig) -> Self {
        let registry = Arc::new(ListingRegistry::new(pool.clone(), provider.clone()));
        let preview_service = Arc::new(PreviewService::new(pool.clone(), provider.clone()));
        let orchestrator = Arc::new(RunOrchestrator::new(pool.clone()));
        let worker = Arc::new(CatalogWorker::new(
            pool.clone(),
            provider.clone(),
            orchestrator.clone(),
            config.clone(),
        ));
        let retry_manager = Arc::new(RetryManager::new(pool.clone(), config.clone()));

        Self {
            pool,
            config,
            provider,
            registry,
            preview_service,
            orchestrator,
            worker,
            retry_manager,
        }
    }
}

/// Create the catalog API router.
///
/// Routes are relative to the nest point; the expected shape is
/// `/stores/:store_id/...` with the tenant context supplied by the outer
/// authentication layer as a request extension.
///
/// # Example
///
/// ```ignore
/// use storelink_api_catalog::router::{catalog_routes, CatalogApiState};
///
/// let state = CatalogApiState::new(pool, provider, CatalogConfig::default());
/// let app = Router::new().nest("/api/v1/stores", catalog_routes(state));
/// ```
pub fn catalog_routes(state: CatalogApiState) -> Router {
    Router::new()
        // Listing registry
        .route("/:store_id/listings", get(handlers::list_listings))
        .route(
            "/:store_id/listings/:product_id",
            get(handlers::get_listing),
        )
        .route(
            "/:store_id/listings/:product_id/link",
            post(handlers::link_listing),
        )
        .route(
            "/:store_id/listings/:product_id/unlink",
            post(handlers::unlink_listing),
        )
        // Previews (read-only)
        .route(
            "/:store_id/catalog/preview/export",
            post(handlers::preview_export),
        )
        .route(
            "/:store_id/catalog/preview/import",
            post(handlers::preview_import),
        )
        .route(
            "/:store_id/catalog/preview/sync-price",
            post(handlers::preview_sync_price),
        )
        .route(
            "/:store_id/catalog/preview/sync-stock",
            post(handlers::preview_sync_stock),
        )
        // Run creation
        .route("/:store_id/catalog/run/export", post(handlers::run_export))
        .route("/:store_id/catalog/run/import", post(handlers::run_import))
        .route(
            "/:store_id/catalog/run/sync-price",
            post(handlers::run_sync_price),
        )
        .route(
            "/:store_id/catalog/run/sync-stock",
            post(handlers::run_sync_stock),
        )
        // Run inspection and control
        .route("/:store_id/runs", get(handlers::list_runs))
        .route("/:store_id/runs/:run_id", get(handlers::get_run))
        .route(
            "/:store_id/runs/:run_id/retry-failed",
            post(handlers::retry_failed),
        )
        .route(
            "/:store_id/runs/:run_id/cancel",
            post(handlers::cancel_run),
        )
        // Worker trigger
        .route("/:store_id/worker/run", post(handlers::run_worker))
        // Store health and remote search
        .route("/:store_id/health", get(handlers::store_health))
        .route(
            "/:store_id/products/search",
            get(handlers::search_products),
        )
        .with_state(state)
}
