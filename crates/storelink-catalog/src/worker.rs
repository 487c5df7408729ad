//! Execution worker: processes queued run items against the storefront.
//!
//! The worker is invoked on demand (`process_batch`) and is stateless
//! between invocations. Claims are atomic (`FOR UPDATE SKIP LOCKED`), so
//! overlapping invocations never process the same item twice; within one
//! invocation a semaphore bounds in-flight storefront requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use storelink_connector::error::ConnectorError;
use storelink_connector::traits::{ProductWrite, StorefrontApi};
use storelink_connector::types::{NewRemoteProduct, RemoteProductPatch};
use storelink_core::{RunId, StoreId, TenantId};
use storelink_db::models::{
    ItemAction, ItemStatus, Listing, LogLevel, NewProduct, Product, ProductPatch, RunItem,
    SyncLogEntry, SyncOperation,
};

use crate::backoff;
use crate::config::{truncate_hint, CatalogConfig};
use crate::error::CatalogResult;
use crate::provider::ConnectorProvider;
use crate::runs::RunOrchestrator;

/// What happened to one claimed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Done,
    Requeued,
    Dead,
    Error,
}

/// How a failed attempt is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Transient failure with retry budget left: back to the queue.
    Requeue,
    /// Transient failure, budget exhausted: terminal `DEAD`.
    Dead,
    /// Permanent rejection: terminal `ERROR`, never auto-retried.
    Error,
}

/// Decide the disposition of a failed attempt.
///
/// `attempts_done` counts completed attempts including the failing one.
pub fn classify_failure(
    attempts_done: i32,
    max_attempts: i32,
    error: &ConnectorError,
) -> FailureDisposition {
    if error.is_permanent() {
        FailureDisposition::Error
    } else if attempts_done < max_attempts {
        FailureDisposition::Requeue
    } else {
        FailureDisposition::Dead
    }
}

/// Per-item result within a worker report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerItemResult {
    pub item_id: Uuid,
    pub run_id: Uuid,
    pub sku: Option<String>,
    pub outcome: ItemOutcome,
    pub error_code: Option<String>,
    pub hint: Option<String>,
}

/// Outcome of one worker invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerReport {
    pub claimed: usize,
    pub done: usize,
    pub requeued: usize,
    pub dead: usize,
    pub errored: usize,
    pub results: Vec<WorkerItemResult>,
    /// Runs whose status was re-converged after the batch.
    pub advanced_runs: Vec<Uuid>,
}

impl WorkerReport {
    fn record(&mut self, result: WorkerItemResult) {
        match result.outcome {
            ItemOutcome::Done => self.done += 1,
            ItemOutcome::Requeued => self.requeued += 1,
            ItemOutcome::Dead => self.dead += 1,
            ItemOutcome::Error => self.errored += 1,
        }
        self.results.push(result);
    }
}

/// The execution worker.
pub struct CatalogWorker {
    pool: PgPool,
    provider: Arc<dyn ConnectorProvider>,
    orchestrator: Arc<RunOrchestrator>,
    config: CatalogConfig,
}

impl CatalogWorker {
    /// Create a new worker.
    pub fn new(
        pool: PgPool,
        provider: Arc<dyn ConnectorProvider>,
        orchestrator: Arc<RunOrchestrator>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            pool,
            provider,
            orchestrator,
            config,
        }
    }

    /// Process up to `limit` queued items for a store, oldest first.
    ///
    /// Returns a report of per-item outcomes. Safe to call from multiple
    /// overlapping schedulers.
    #[instrument(skip(self), fields(tenant = %tenant_id, store = %store_id))]
    pub async fn process_batch(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        limit: i64,
    ) -> CatalogResult<WorkerReport> {
        let limit = limit.clamp(1, 100);

        // Resolve the connector before claiming anything, so an inactive
        // store or bad configuration leaves no item stranded in RUNNING.
        let connector = self
            .provider
            .connector_for_store(tenant_id, store_id)
            .await?;

        let claimed = RunItem::claim_batch(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            limit,
        )
        .await?;

        let mut report = WorkerReport {
            claimed: claimed.len(),
            ..WorkerReport::default()
        };
        if claimed.is_empty() {
            return Ok(report);
        }

        info!(claimed = claimed.len(), "processing batch");

        // The action/diff of an item is interpreted in the context of its
        // run's operation; cache one lookup per run.
        let mut operations: HashMap<Uuid, SyncOperation> = HashMap::new();
        for item in &claimed {
            if !operations.contains_key(&item.run_id) {
                let operation = self
                    .orchestrator
                    .operation_of(tenant_id, store_id, RunId::from_uuid(item.run_id))
                    .await?;
                operations.insert(item.run_id, operation);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.worker_concurrency.max(1)));
        let mut handles = Vec::with_capacity(claimed.len());
        for item in claimed {
            let operation = operations[&item.run_id];
            let pool = self.pool.clone();
            let connector = connector.clone();
            let semaphore = semaphore.clone();
            let tenant = tenant_id.into_uuid();
            let store = store_id.into_uuid();

            handles.push(tokio::spawn(async move {
                // Never closed; holds the slot until the task finishes.
                let _permit = semaphore.acquire_owned().await.ok();
                process_item(pool, connector, tenant, store, operation, item).await
            }));
        }

        let mut touched_runs = HashSet::new();
        for handle in handles {
            match handle.await {
                Ok(result) => {
                    touched_runs.insert(result.run_id);
                    report.record(result);
                }
                Err(e) => {
                    // A panicked task leaves its item RUNNING; the claim
                    // lock expires with the row update on the next pass.
                    error!(error = %e, "item task failed");
                }
            }
        }

        for run_id in touched_runs {
            self.orchestrator
                .advance(tenant_id, store_id, RunId::from_uuid(run_id))
                .await?;
            report.advanced_runs.push(run_id);
        }

        info!(
            done = report.done,
            requeued = report.requeued,
            dead = report.dead,
            errored = report.errored,
            "batch finished"
        );
        Ok(report)
    }
}

/// Execute one claimed item and record its outcome.
#[instrument(skip(pool, connector, item), fields(item_id = %item.id, run_id = %item.run_id, operation = %operation))]
async fn process_item(
    pool: PgPool,
    connector: Arc<dyn StorefrontApi>,
    tenant_id: Uuid,
    store_id: Uuid,
    operation: SyncOperation,
    item: RunItem,
) -> WorkerItemResult {
    let outcome = execute_item(&pool, connector.as_ref(), tenant_id, store_id, operation, &item)
        .await;

    match outcome {
        Ok(()) => {
            let _ = SyncLogEntry::append(
                &pool,
                tenant_id,
                store_id,
                Some(item.run_id),
                Some(item.id),
                LogLevel::Info,
                "item_done",
                json!({ "sku": item.sku, "action": item.action }),
            )
            .await;
            WorkerItemResult {
                item_id: item.id,
                run_id: item.run_id,
                sku: item.sku.clone(),
                outcome: ItemOutcome::Done,
                error_code: None,
                hint: None,
            }
        }
        Err(ExecutionError::Connector(e)) => {
            finalize_failure(&pool, tenant_id, store_id, &item, &e).await
        }
        Err(ExecutionError::Database(e)) => {
            // Leave the item RUNNING; the database came back inconsistent
            // and the next pass will re-converge via advance.
            error!(error = %e, "item transaction failed");
            WorkerItemResult {
                item_id: item.id,
                run_id: item.run_id,
                sku: item.sku.clone(),
                outcome: ItemOutcome::Error,
                error_code: Some("DATABASE_ERROR".to_string()),
                hint: Some(truncate_hint(&e.to_string())),
            }
        }
    }
}

/// Record a failed attempt per the retry policy.
async fn finalize_failure(
    pool: &PgPool,
    tenant_id: Uuid,
    store_id: Uuid,
    item: &RunItem,
    error: &ConnectorError,
) -> WorkerItemResult {
    let attempts_done = item.attempts + 1;
    let disposition = classify_failure(attempts_done, item.max_attempts, error);
    // The adapter's code and message are recorded verbatim (bounded) for
    // operator diagnosis.
    let code = error.error_code();
    let hint = truncate_hint(&error.to_string());

    let (outcome, level) = match disposition {
        FailureDisposition::Requeue => {
            let next_at = backoff::next_attempt_at(attempts_done);
            if let Err(e) =
                RunItem::requeue(pool, tenant_id, item.id, next_at, code, Some(&hint)).await
            {
                error!(error = %e, "failed to requeue item");
            }
            warn!(code, attempts = attempts_done, "transient failure, requeued");
            (ItemOutcome::Requeued, LogLevel::Warn)
        }
        FailureDisposition::Dead => {
            if let Err(e) =
                RunItem::mark_failed(pool, tenant_id, item.id, ItemStatus::Dead, code, Some(&hint))
                    .await
            {
                error!(error = %e, "failed to mark item dead");
            }
            warn!(code, attempts = attempts_done, "retry budget exhausted, item dead");
            (ItemOutcome::Dead, LogLevel::Error)
        }
        FailureDisposition::Error => {
            if let Err(e) = RunItem::mark_failed(
                pool,
                tenant_id,
                item.id,
                ItemStatus::Error,
                code,
                Some(&hint),
            )
            .await
            {
                error!(error = %e, "failed to mark item errored");
            }
            if let Some(product_id) = item.product_id {
                let _ = Listing::record_error(
                    pool, tenant_id, store_id, product_id, code, Some(&hint),
                )
                .await;
            }
            warn!(code, "permanent failure, item errored");
            (ItemOutcome::Error, LogLevel::Error)
        }
    };

    let _ = SyncLogEntry::append(
        pool,
        tenant_id,
        store_id,
        Some(item.run_id),
        Some(item.id),
        level,
        "item_failed",
        json!({ "sku": item.sku, "code": code, "hint": hint, "attempts": attempts_done }),
    )
    .await;

    WorkerItemResult {
        item_id: item.id,
        run_id: item.run_id,
        sku: item.sku.clone(),
        outcome,
        error_code: Some(code.to_string()),
        hint: Some(hint),
    }
}

enum ExecutionError {
    Connector(ConnectorError),
    Database(sqlx::Error),
}

impl From<ConnectorError> for ExecutionError {
    fn from(e: ConnectorError) -> Self {
        Self::Connector(e)
    }
}

impl From<sqlx::Error> for ExecutionError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

/// Execute the remote (or local, for imports) write for one item and
/// commit the item transition plus the listing mutation in one
/// transaction.
async fn execute_item(
    pool: &PgPool,
    connector: &dyn StorefrontApi,
    tenant_id: Uuid,
    store_id: Uuid,
    operation: SyncOperation,
    item: &RunItem,
) -> Result<(), ExecutionError> {
    match (operation, item.action()) {
        (SyncOperation::Import, ItemAction::Create) => {
            let input = NewProduct {
                sku: item.sku.clone(),
                name: diff_new_string(&item.diff, "name").unwrap_or_default(),
                price: diff_new_decimal(&item.diff, "price"),
                stock: diff_new_i32(&item.diff, "stock").unwrap_or(0),
            };
            let mut tx = pool.begin().await?;
            let product = Product::insert_imported(&mut tx, tenant_id, &input).await?;
            if let Some(remote_id) = item.remote_product_id {
                Listing::record_synced(
                    &mut tx,
                    tenant_id,
                    store_id,
                    product.id,
                    item.sku.as_deref(),
                    remote_id,
                    item.remote_variation_id,
                    true,
                    true,
                )
                .await?;
            }
            RunItem::mark_done(&mut tx, tenant_id, item.id, None, None).await?;
            tx.commit().await?;
            Ok(())
        }
        (SyncOperation::Import, ItemAction::Update) => {
            let Some(product_id) = item.product_id else {
                return Err(ConnectorError::invalid_data("item has no internal product").into());
            };
            let patch = ProductPatch {
                name: diff_new_string(&item.diff, "name"),
                price: diff_new_decimal(&item.diff, "price"),
                stock: diff_new_i32(&item.diff, "stock"),
            };
            let mut tx = pool.begin().await?;
            Product::apply_patch(&mut tx, tenant_id, product_id, &patch).await?;
            if let Some(remote_id) = item.remote_product_id {
                Listing::record_synced(
                    &mut tx,
                    tenant_id,
                    store_id,
                    product_id,
                    item.sku.as_deref(),
                    remote_id,
                    item.remote_variation_id,
                    patch.price.is_some(),
                    patch.stock.is_some(),
                )
                .await?;
            }
            RunItem::mark_done(&mut tx, tenant_id, item.id, None, None).await?;
            tx.commit().await?;
            Ok(())
        }
        (_, ItemAction::Create) => {
            let Some(sku) = item.sku.clone().filter(|s| !s.trim().is_empty()) else {
                return Err(ConnectorError::invalid_data("item has no SKU").into());
            };
            let Some(price) = diff_new_decimal(&item.diff, "price") else {
                return Err(ConnectorError::invalid_data("item has no price").into());
            };
            let created = connector
                .create_product(NewRemoteProduct {
                    sku,
                    name: diff_new_string(&item.diff, "name").unwrap_or_default(),
                    regular_price: price,
                    stock_quantity: diff_new_i32(&item.diff, "stock"),
                    manage_stock: true,
                })
                .await?;

            let mut tx = pool.begin().await?;
            RunItem::mark_done(&mut tx, tenant_id, item.id, Some(created.id), created.variation_id)
                .await?;
            if let Some(product_id) = item.product_id {
                Listing::record_synced(
                    &mut tx,
                    tenant_id,
                    store_id,
                    product_id,
                    item.sku.as_deref(),
                    created.id,
                    created.variation_id,
                    true,
                    true,
                )
                .await?;
            }
            tx.commit().await?;
            Ok(())
        }
        (_, ItemAction::Update) => {
            let Some(remote_product_id) = item.remote_product_id else {
                return Err(ConnectorError::invalid_data("item has no remote id").into());
            };
            let patch = RemoteProductPatch {
                name: diff_new_string(&item.diff, "name"),
                regular_price: diff_new_decimal(&item.diff, "price"),
                stock_quantity: diff_new_i32(&item.diff, "stock"),
                manage_stock: diff_new_i32(&item.diff, "stock").map(|_| true),
            };
            match item.remote_variation_id {
                Some(variation_id) => {
                    connector
                        .update_variation(remote_product_id, variation_id, patch)
                        .await?
                }
                None => connector.update_product(remote_product_id, patch).await?,
            };

            let mut tx = pool.begin().await?;
            RunItem::mark_done(&mut tx, tenant_id, item.id, None, None).await?;
            if let Some(product_id) = item.product_id {
                Listing::record_synced(
                    &mut tx,
                    tenant_id,
                    store_id,
                    product_id,
                    item.sku.as_deref(),
                    remote_product_id,
                    item.remote_variation_id,
                    operation == SyncOperation::SyncPrice || diff_has(&item.diff, "price"),
                    operation == SyncOperation::SyncStock || diff_has(&item.diff, "stock"),
                )
                .await?;
            }
            tx.commit().await?;
            Ok(())
        }
        // SKIP/BLOCK items are finalized at run creation and never claimed.
        (_, action) => Err(ConnectorError::internal(format!(
            "unexpected claimed action {action}"
        ))
        .into()),
    }
}

// --- diff payload accessors -------------------------------------------------
//
// The diff is an open `field → {old, new}` map; the worker only reads the
// `new` side of the fields it knows how to write.

fn diff_new(diff: &JsonValue, field: &str) -> Option<JsonValue> {
    diff.get(field)?.get("new").cloned()
}

fn diff_has(diff: &JsonValue, field: &str) -> bool {
    diff.get(field).is_some()
}

fn diff_new_string(diff: &JsonValue, field: &str) -> Option<String> {
    match diff_new(diff, field)? {
        JsonValue::String(s) => Some(s),
        _ => None,
    }
}

fn diff_new_decimal(diff: &JsonValue, field: &str) -> Option<Decimal> {
    match diff_new(diff, field)? {
        JsonValue::String(s) => Decimal::from_str(&s).ok(),
        JsonValue::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn diff_new_i32(diff: &JsonValue, field: &str) -> Option<i32> {
    diff_new(diff, field)?.as_i64().map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> ConnectorError {
        ConnectorError::RateLimited {
            retry_after_secs: Some(5),
        }
    }

    fn permanent() -> ConnectorError {
        ConnectorError::invalid_data("bad payload")
    }

    #[test]
    fn test_transient_with_budget_requeues() {
        assert_eq!(
            classify_failure(1, 3, &transient()),
            FailureDisposition::Requeue
        );
        assert_eq!(
            classify_failure(2, 3, &transient()),
            FailureDisposition::Requeue
        );
    }

    #[test]
    fn test_transient_without_budget_is_dead() {
        assert_eq!(classify_failure(3, 3, &transient()), FailureDisposition::Dead);
        assert_eq!(classify_failure(5, 3, &transient()), FailureDisposition::Dead);
    }

    #[test]
    fn test_permanent_is_error_regardless_of_budget() {
        assert_eq!(classify_failure(1, 3, &permanent()), FailureDisposition::Error);
        assert_eq!(classify_failure(3, 3, &permanent()), FailureDisposition::Error);
    }

    #[test]
    fn test_diff_accessors() {
        let diff = json!({
            "name": { "old": null, "new": "Widget" },
            "price": { "old": "19.90", "new": "21.00" },
            "stock": { "old": 3, "new": 7 }
        });

        assert_eq!(diff_new_string(&diff, "name").as_deref(), Some("Widget"));
        assert_eq!(
            diff_new_decimal(&diff, "price"),
            Some(Decimal::from_str("21.00").unwrap())
        );
        assert_eq!(diff_new_i32(&diff, "stock"), Some(7));
        assert!(diff_has(&diff, "price"));
        assert!(!diff_has(&diff, "status"));
        assert_eq!(diff_new_string(&diff, "missing"), None);
    }

    #[test]
    fn test_diff_decimal_accepts_numbers() {
        let diff = json!({ "price": { "old": null, "new": 19.5 } });
        assert_eq!(
            diff_new_decimal(&diff, "price"),
            Some(Decimal::from_str("19.5").unwrap())
        );
    }

    #[test]
    fn test_report_counters() {
        let mut report = WorkerReport::default();
        for outcome in [
            ItemOutcome::Done,
            ItemOutcome::Done,
            ItemOutcome::Requeued,
            ItemOutcome::Dead,
            ItemOutcome::Error,
        ] {
            report.record(WorkerItemResult {
                item_id: Uuid::new_v4(),
                run_id: Uuid::new_v4(),
                sku: None,
                outcome,
                error_code: None,
                hint: None,
            });
        }
        assert_eq!(report.done, 2);
        assert_eq!(report.requeued, 1);
        assert_eq!(report.dead, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.results.len(), 5);
    }
}
