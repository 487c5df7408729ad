//! Retry manager: re-attempt the failed items of a finished run.
//!
//! Failed source items are cloned into a brand-new run linked via
//! `source_run_id`; the source run and its items stay immutable.

use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use storelink_core::{RunId, StoreId, TenantId};
use storelink_db::models::{
    CatalogRun, ItemStatus, NewRunItem, RunItem, RunStatus, RunSummary, SyncOperation,
};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};

/// Result of a retry request.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub new_run: CatalogRun,
    pub source_run_id: Uuid,
    pub retried_items: usize,
}

/// Build the fresh item for one failed source item.
///
/// Status and attempt counters reset; action, identity and diff are
/// copied verbatim.
fn clone_failed_item(source: &RunItem, max_attempts: i32) -> NewRunItem {
    NewRunItem {
        sku: source.sku.clone(),
        product_id: source.product_id,
        remote_product_id: source.remote_product_id,
        remote_variation_id: source.remote_variation_id,
        action: source.action(),
        status: ItemStatus::Queued,
        diff: source.diff.clone(),
        warnings: Vec::new(),
        blockers: Vec::new(),
        max_attempts,
    }
}

/// Summary counters for a retry run: only the failed actions reappear.
fn retry_summary(items: &[NewRunItem]) -> RunSummary {
    let mut summary = RunSummary::default();
    for item in items {
        match item.action {
            storelink_db::models::ItemAction::Create => summary.create += 1,
            storelink_db::models::ItemAction::Update => summary.update += 1,
            storelink_db::models::ItemAction::Skip => summary.skip += 1,
            storelink_db::models::ItemAction::Block => summary.block += 1,
        }
    }
    summary
}

/// The retry manager.
pub struct RetryManager {
    pool: PgPool,
    config: CatalogConfig,
}

impl RetryManager {
    /// Create a new retry manager.
    pub fn new(pool: PgPool, config: CatalogConfig) -> Self {
        Self { pool, config }
    }

    /// Create a new run containing fresh copies of the source run's
    /// `ERROR` and `DEAD` items.
    ///
    /// Items in any other status are untouched and not duplicated. With
    /// zero failed items this still returns a new (immediately `done`)
    /// run with a count of 0, so defensive callers can always invoke it.
    #[instrument(skip(self), fields(tenant = %tenant_id, store = %store_id, source_run = %run_id))]
    pub async fn retry_failed(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        run_id: RunId,
    ) -> CatalogResult<RetryOutcome> {
        let source = CatalogRun::find_by_id(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            run_id.into_uuid(),
        )
        .await?
        .ok_or(CatalogError::RunNotFound(run_id.into_uuid()))?;

        let operation: SyncOperation = source.operation().ok_or_else(|| {
            CatalogError::validation(format!("run {} has an unknown operation", source.id))
        })?;

        // Source items are immutable once finalized; a plain read suffices.
        let failed = RunItem::list_failed(&self.pool, tenant_id.into_uuid(), source.id).await?;
        let items: Vec<NewRunItem> = failed
            .iter()
            .map(|item| clone_failed_item(item, self.config.max_attempts))
            .collect();

        let status = if items.is_empty() {
            RunStatus::Done
        } else {
            RunStatus::Queued
        };
        let summary = retry_summary(&items);

        let mut tx = self.pool.begin().await?;
        let new_run = CatalogRun::create(
            &mut tx,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            operation,
            status,
            &summary,
            Some(source.id),
        )
        .await?;
        RunItem::create_batch(
            &mut tx,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            new_run.id,
            &items,
        )
        .await?;
        tx.commit().await?;

        info!(
            new_run_id = %new_run.id,
            retried_items = items.len(),
            "retry run created"
        );

        Ok(RetryOutcome {
            source_run_id: source.id,
            retried_items: items.len(),
            new_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use storelink_db::models::ItemAction;

    fn failed_item(action: ItemAction, attempts: i32) -> RunItem {
        RunItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            sku: Some("SKU-1".to_string()),
            product_id: Some(Uuid::new_v4()),
            remote_product_id: Some(42),
            remote_variation_id: None,
            action: action.to_string(),
            status: ItemStatus::Dead.to_string(),
            diff: json!({ "price": { "old": "1.00", "new": "2.00" } }),
            warnings: json!(["PRICE_WITHIN_TOLERANCE"]),
            blockers: json!([]),
            attempts,
            max_attempts: 3,
            next_attempt_at: None,
            error_code: Some("RATE_LIMITED".to_string()),
            hint: Some("rate limited by storefront".to_string()),
            last_error_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_clone_resets_execution_state() {
        let source = failed_item(ItemAction::Update, 3);
        let cloned = clone_failed_item(&source, 5);

        assert_eq!(cloned.status, ItemStatus::Queued);
        assert_eq!(cloned.action, ItemAction::Update);
        assert_eq!(cloned.max_attempts, 5);
        assert_eq!(cloned.sku.as_deref(), Some("SKU-1"));
        assert_eq!(cloned.remote_product_id, Some(42));
        // The diff travels verbatim; attempt/error state does not.
        assert_eq!(cloned.diff, source.diff);
        assert!(cloned.warnings.is_empty());
        assert!(cloned.blockers.is_empty());
    }

    #[test]
    fn test_retry_summary_counts_actions() {
        let items = vec![
            clone_failed_item(&failed_item(ItemAction::Create, 3), 3),
            clone_failed_item(&failed_item(ItemAction::Update, 3), 3),
            clone_failed_item(&failed_item(ItemAction::Update, 3), 3),
        ];
        let summary = retry_summary(&items);
        assert_eq!(summary.create, 1);
        assert_eq!(summary.update, 2);
        assert_eq!(summary.total(), 3);
    }
}
