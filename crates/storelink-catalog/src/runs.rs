//! Run orchestration: turning approved previews into durable runs and
//! managing the run lifecycle state machine.

use sqlx::PgPool;
use tracing::{info, instrument};

use storelink_core::{RunId, StoreId, TenantId};
use storelink_db::models::{
    CatalogRun, ItemStatusCounts, RunItem, RunStatus, RunSummary, SyncOperation,
};

use crate::error::{CatalogError, CatalogResult};
use crate::preview::Preview;

/// Decide the run status implied by its item counts.
///
/// Aggregation rule: once nothing is queued or running, the run is
/// terminal — `done` when no item failed, `error` when failures exist and
/// nothing succeeded, `partial` when both occurred. Until then the run is
/// `running` as soon as any item has left `QUEUED`, otherwise it stays
/// `queued`. Terminal states are never left.
pub fn resolve_run_status(current: RunStatus, counts: &ItemStatusCounts) -> RunStatus {
    if current.is_terminal() {
        return current;
    }

    if counts.in_flight() == 0 {
        return if counts.failures() == 0 {
            RunStatus::Done
        } else if counts.done > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Error
        };
    }

    if counts.running > 0 || counts.done + counts.error + counts.dead > 0 {
        RunStatus::Running
    } else {
        current
    }
}

/// Merge live item counts into the run's summary counters.
fn refresh_summary(mut summary: RunSummary, counts: &ItemStatusCounts) -> RunSummary {
    summary.done = counts.done;
    summary.error = counts.error;
    summary.dead = counts.dead;
    summary.skipped = counts.skipped;
    summary
}

/// Orchestrates run creation and lifecycle transitions.
pub struct RunOrchestrator {
    pool: PgPool,
}

impl RunOrchestrator {
    /// Create a new orchestrator.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist an approved preview as a run plus its items.
    ///
    /// The only place a run transitions from nonexistent to `queued`.
    /// Non-actionable items (`SKIP`/`BLOCK`) are stored already finalized;
    /// a preview without actionable items yields a run that is `done`
    /// immediately.
    #[instrument(skip(self, preview), fields(tenant = %tenant_id, store = %store_id, operation = %preview.operation))]
    pub async fn create_run(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        preview: &Preview,
        max_attempts: i32,
        source_run_id: Option<RunId>,
    ) -> CatalogResult<CatalogRun> {
        let summary = RunSummary {
            create: preview.summary.create,
            update: preview.summary.update,
            skip: preview.summary.skip,
            block: preview.summary.block,
            skipped: preview.summary.skip + preview.summary.block,
            ..RunSummary::default()
        };

        let status = if preview.has_actionable_items() {
            RunStatus::Queued
        } else {
            RunStatus::Done
        };

        let mut tx = self.pool.begin().await?;
        let run = CatalogRun::create(
            &mut tx,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            preview.operation,
            status,
            &summary,
            source_run_id.map(RunId::into_uuid),
        )
        .await?;

        let items: Vec<_> = preview
            .items
            .iter()
            .map(|item| item.to_run_item(max_attempts))
            .collect();
        let inserted = RunItem::create_batch(
            &mut tx,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            run.id,
            &items,
        )
        .await?;
        tx.commit().await?;

        info!(
            run_id = %run.id,
            items = inserted,
            status = %run.status,
            "run created"
        );
        Ok(run)
    }

    /// Converge the run status with its item states.
    ///
    /// Safe to call repeatedly and from concurrent workers: the run row
    /// lock serializes the read-compute-write cycle.
    #[instrument(skip(self), fields(tenant = %tenant_id, store = %store_id, run = %run_id))]
    pub async fn advance(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        run_id: RunId,
    ) -> CatalogResult<CatalogRun> {
        let mut tx = self.pool.begin().await?;
        let run = CatalogRun::find_for_update(
            &mut tx,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            run_id.into_uuid(),
        )
        .await?
        .ok_or(CatalogError::RunNotFound(run_id.into_uuid()))?;

        if run.status().is_terminal() {
            tx.commit().await?;
            return Ok(run);
        }

        let counts = RunItem::counts_for_run(&mut tx, tenant_id.into_uuid(), run.id).await?;
        let next_status = resolve_run_status(run.status(), &counts);
        let summary = refresh_summary(run.summary(), &counts);

        let updated = CatalogRun::update_status(
            &mut tx,
            tenant_id.into_uuid(),
            run.id,
            next_status,
            &summary,
        )
        .await?
        .ok_or(CatalogError::RunNotFound(run_id.into_uuid()))?;
        tx.commit().await?;

        if updated.status != run.status {
            info!(run_id = %run.id, from = %run.status, to = %updated.status, "run advanced");
        }
        Ok(updated)
    }

    /// Fetch one run.
    pub async fn get_run(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        run_id: RunId,
    ) -> CatalogResult<CatalogRun> {
        CatalogRun::find_by_id(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            run_id.into_uuid(),
        )
        .await?
        .ok_or(CatalogError::RunNotFound(run_id.into_uuid()))
    }

    /// Fetch one run together with all of its items.
    pub async fn get_run_with_items(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        run_id: RunId,
    ) -> CatalogResult<(CatalogRun, Vec<RunItem>)> {
        let run = self.get_run(tenant_id, store_id, run_id).await?;
        let items = RunItem::list_by_run(&self.pool, tenant_id.into_uuid(), run.id).await?;
        Ok((run, items))
    }

    /// List the most recent runs of a store.
    pub async fn list_runs(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        limit: i64,
    ) -> CatalogResult<Vec<CatalogRun>> {
        Ok(CatalogRun::list_by_store(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            limit.clamp(1, 100),
        )
        .await?)
    }

    /// Cancel a run that is still `queued` or `running`.
    ///
    /// Remaining `QUEUED` items are finalized as `SKIPPED`; items already
    /// `RUNNING` finish naturally to avoid partial remote writes.
    #[instrument(skip(self), fields(tenant = %tenant_id, store = %store_id, run = %run_id))]
    pub async fn cancel_run(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        run_id: RunId,
    ) -> CatalogResult<CatalogRun> {
        let mut tx = self.pool.begin().await?;
        let run = CatalogRun::find_for_update(
            &mut tx,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            run_id.into_uuid(),
        )
        .await?
        .ok_or(CatalogError::RunNotFound(run_id.into_uuid()))?;

        if !run.status().can_cancel() {
            return Err(CatalogError::InvalidRunState {
                run_id: run.id,
                current_state: run.status.clone(),
                action: "cancel".to_string(),
            });
        }

        let skipped = RunItem::skip_queued(&mut tx, tenant_id.into_uuid(), run.id).await?;
        let counts = RunItem::counts_for_run(&mut tx, tenant_id.into_uuid(), run.id).await?;
        let summary = refresh_summary(run.summary(), &counts);
        let updated = CatalogRun::update_status(
            &mut tx,
            tenant_id.into_uuid(),
            run.id,
            RunStatus::Canceled,
            &summary,
        )
        .await?
        .ok_or(CatalogError::RunNotFound(run_id.into_uuid()))?;
        tx.commit().await?;

        info!(run_id = %run.id, skipped_items = skipped, "run canceled");
        Ok(updated)
    }

    /// The operation of a run, needed by the worker to interpret items.
    pub async fn operation_of(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        run_id: RunId,
    ) -> CatalogResult<SyncOperation> {
        let run = self.get_run(tenant_id, store_id, run_id).await?;
        run.operation().ok_or_else(|| {
            CatalogError::validation(format!("run {} has an unknown operation", run.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(
        queued: i64,
        running: i64,
        done: i64,
        error: i64,
        dead: i64,
        skipped: i64,
    ) -> ItemStatusCounts {
        ItemStatusCounts {
            queued,
            running,
            done,
            error,
            dead,
            skipped,
        }
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        for status in [
            RunStatus::Done,
            RunStatus::Error,
            RunStatus::Partial,
            RunStatus::Canceled,
        ] {
            assert_eq!(
                resolve_run_status(status, &counts(5, 0, 0, 0, 0, 0)),
                status
            );
        }
    }

    #[test]
    fn test_queued_stays_queued_without_activity() {
        assert_eq!(
            resolve_run_status(RunStatus::Queued, &counts(3, 0, 0, 0, 0, 2)),
            RunStatus::Queued
        );
    }

    #[test]
    fn test_first_claim_moves_to_running() {
        assert_eq!(
            resolve_run_status(RunStatus::Queued, &counts(2, 1, 0, 0, 0, 0)),
            RunStatus::Running
        );
        assert_eq!(
            resolve_run_status(RunStatus::Queued, &counts(2, 0, 1, 0, 0, 0)),
            RunStatus::Running
        );
    }

    #[test]
    fn test_all_success_is_done() {
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(0, 0, 5, 0, 0, 2)),
            RunStatus::Done
        );
    }

    #[test]
    fn test_skipped_only_run_is_done() {
        // Preview with only SKIP/BLOCK items finalizes immediately as done.
        assert_eq!(
            resolve_run_status(RunStatus::Queued, &counts(0, 0, 0, 0, 0, 4)),
            RunStatus::Done
        );
    }

    #[test]
    fn test_mixed_outcome_is_partial() {
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(0, 0, 9, 1, 0, 0)),
            RunStatus::Partial
        );
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(0, 0, 1, 0, 3, 0)),
            RunStatus::Partial
        );
    }

    #[test]
    fn test_failures_only_is_error() {
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(0, 0, 0, 2, 1, 0)),
            RunStatus::Error
        );
        // Skipped items do not count as successes.
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(0, 0, 0, 1, 0, 3)),
            RunStatus::Error
        );
    }

    #[test]
    fn test_in_flight_items_keep_running() {
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(0, 2, 5, 1, 0, 0)),
            RunStatus::Running
        );
        assert_eq!(
            resolve_run_status(RunStatus::Running, &counts(3, 0, 5, 0, 0, 0)),
            RunStatus::Running
        );
    }

    #[test]
    fn test_refresh_summary_keeps_action_counters() {
        let summary = RunSummary {
            create: 3,
            update: 2,
            skip: 1,
            block: 1,
            ..RunSummary::default()
        };
        let refreshed = refresh_summary(summary, &counts(0, 0, 4, 1, 0, 2));
        assert_eq!(refreshed.create, 3);
        assert_eq!(refreshed.update, 2);
        assert_eq!(refreshed.done, 4);
        assert_eq!(refreshed.error, 1);
        assert_eq!(refreshed.skipped, 2);
    }
}
