//! Diff engine: side-effect-free preview computation.
//!
//! The classification core is a pure function over snapshots of the three
//! states involved (internal products, listings, remote products), so the
//! same inputs always produce the same preview. [`PreviewService`]
//! assembles those snapshots (database reads plus connector reads) and
//! never writes anything; a preview only becomes durable when the caller
//! submits it to the run orchestrator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

use storelink_connector::traits::ProductSearch;
use storelink_connector::types::{RemoteProduct, RemoteProductType};
use storelink_core::{ProductId, StoreId, TenantId};
use storelink_db::models::{
    ItemAction, ItemStatus, Listing, ListingStatus, NewRunItem, Product, SyncOperation,
};

use crate::error::{CatalogError, CatalogResult};
use crate::provider::ConnectorProvider;

/// Options influencing diff classification.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Price deltas at or below this threshold are not worth an update.
    pub price_tolerance: Decimal,
}

/// An `{old, new}` pair for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: JsonValue,
    pub new: JsonValue,
}

/// Open, ordered field-level diff. Serialization-only: the engine never
/// branches on diff contents, only on the action tag.
pub type FieldDiff = BTreeMap<String, FieldChange>;

/// Internal product state as seen by the diff engine.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub sku: Option<String>,
    pub name: String,
    pub price: Option<Decimal>,
    pub stock: i32,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: ProductId::from_uuid(product.id),
            sku: product.sku.clone(),
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
        }
    }
}

/// Listing state as seen by the diff engine.
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub status: ListingStatus,
}

impl ListingSnapshot {
    /// Whether the listing carries a remote identity believed valid.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.status == ListingStatus::Linked && self.remote_product_id.is_some()
    }
}

impl From<&Listing> for ListingSnapshot {
    fn from(listing: &Listing) -> Self {
        Self {
            product_id: ProductId::from_uuid(listing.product_id),
            sku: listing.sku.clone(),
            remote_product_id: listing.remote_product_id,
            remote_variation_id: listing.remote_variation_id,
            status: listing.status(),
        }
    }
}

/// Per-action counts of a preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub create: i64,
    pub update: i64,
    pub skip: i64,
    pub block: i64,
}

impl PreviewSummary {
    fn record(&mut self, action: ItemAction) {
        match action {
            ItemAction::Create => self.create += 1,
            ItemAction::Update => self.update += 1,
            ItemAction::Skip => self.skip += 1,
            ItemAction::Block => self.block += 1,
        }
    }

    /// Total classified items; equals the deduplicated target count.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.create + self.update + self.skip + self.block
    }
}

/// One classified target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewItem {
    pub sku: Option<String>,
    pub product_id: Option<ProductId>,
    pub remote_product_id: Option<i64>,
    pub remote_variation_id: Option<i64>,
    pub action: ItemAction,
    pub warnings: Vec<String>,
    pub blockers: Vec<String>,
    pub diff: FieldDiff,
}

impl PreviewItem {
    /// Convert into a durable run item input.
    ///
    /// `SKIP` and `BLOCK` items are finalized at creation; they may never
    /// transition to `RUNNING`.
    #[must_use]
    pub fn to_run_item(&self, max_attempts: i32) -> NewRunItem {
        let status = if self.action.is_actionable() {
            ItemStatus::Queued
        } else {
            ItemStatus::Skipped
        };
        NewRunItem {
            sku: self.sku.clone(),
            product_id: self.product_id.map(ProductId::into_uuid),
            remote_product_id: self.remote_product_id,
            remote_variation_id: self.remote_variation_id,
            action: self.action,
            status,
            diff: serde_json::to_value(&self.diff).unwrap_or(JsonValue::Null),
            warnings: self.warnings.clone(),
            blockers: self.blockers.clone(),
            max_attempts,
        }
    }
}

/// The result of a diff computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub operation: SyncOperation,
    pub summary: PreviewSummary,
    pub items: Vec<PreviewItem>,
}

impl Preview {
    /// Whether any item would actually be executed by a worker.
    #[must_use]
    pub fn has_actionable_items(&self) -> bool {
        self.items.iter().any(|i| i.action.is_actionable())
    }
}

// ---------------------------------------------------------------------------
// Pure classification core
// ---------------------------------------------------------------------------

/// Deduplicate targets, keeping the first position of each id. Later
/// occurrences win by definition, but carry no distinct payload here.
fn dedup_targets<T: Copy + Eq + std::hash::Hash>(targets: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .copied()
        .filter(|t| seen.insert(*t))
        .collect()
}

fn json_decimal(value: Option<Decimal>) -> JsonValue {
    value
        .and_then(|d| serde_json::to_value(d).ok())
        .unwrap_or(JsonValue::Null)
}

enum PriceCmp {
    Equal,
    WithinTolerance,
    Changed,
}

/// Exact decimal comparison with an optional tolerance band.
fn compare_price(current: Option<Decimal>, desired: Decimal, tolerance: Decimal) -> PriceCmp {
    match current {
        None => PriceCmp::Changed,
        Some(current) if current == desired => PriceCmp::Equal,
        Some(current) => {
            let delta = (current - desired).abs();
            if tolerance > Decimal::ZERO && delta <= tolerance {
                PriceCmp::WithinTolerance
            } else {
                PriceCmp::Changed
            }
        }
    }
}

fn blocked_item(
    sku: Option<String>,
    product_id: Option<ProductId>,
    remote_product_id: Option<i64>,
    remote_variation_id: Option<i64>,
    blockers: Vec<String>,
) -> PreviewItem {
    PreviewItem {
        sku,
        product_id,
        remote_product_id,
        remote_variation_id,
        action: ItemAction::Block,
        warnings: Vec::new(),
        blockers,
        diff: FieldDiff::new(),
    }
}

/// Compute an EXPORT preview (internal → remote).
pub fn compute_export_preview(
    targets: &[ProductId],
    products: &HashMap<ProductId, ProductSnapshot>,
    listings: &HashMap<ProductId, ListingSnapshot>,
    remotes: &HashMap<(i64, Option<i64>), RemoteProduct>,
    options: &DiffOptions,
) -> Preview {
    let mut summary = PreviewSummary::default();
    let mut items = Vec::new();

    for target in dedup_targets(targets) {
        let listing = listings.get(&target);
        let item = classify_export_target(target, products.get(&target), listing, remotes, options);
        summary.record(item.action);
        items.push(item);
    }

    Preview {
        operation: SyncOperation::Export,
        summary,
        items,
    }
}

fn classify_export_target(
    target: ProductId,
    product: Option<&ProductSnapshot>,
    listing: Option<&ListingSnapshot>,
    remotes: &HashMap<(i64, Option<i64>), RemoteProduct>,
    options: &DiffOptions,
) -> PreviewItem {
    // An unresolved conflict always blocks, regardless of operation.
    if listing.map(|l| l.status) == Some(ListingStatus::Conflict) {
        return blocked_item(
            listing.and_then(|l| l.sku.clone()),
            Some(target),
            listing.and_then(|l| l.remote_product_id),
            listing.and_then(|l| l.remote_variation_id),
            vec!["CONFLICT".to_string()],
        );
    }

    let Some(product) = product else {
        return blocked_item(
            listing.and_then(|l| l.sku.clone()),
            Some(target),
            None,
            None,
            vec!["PRODUCT_NOT_FOUND".to_string()],
        );
    };

    match listing.filter(|l| l.is_linked()) {
        None => {
            // No valid link: export means creating the remote product.
            let mut blockers = Vec::new();
            if product.sku.as_deref().map_or(true, |s| s.trim().is_empty()) {
                blockers.push("SKU_REQUIRED".to_string());
            }
            if product.name.trim().is_empty() {
                blockers.push("NAME_REQUIRED".to_string());
            }
            if product.price.is_none() {
                blockers.push("PRICE_REQUIRED".to_string());
            }
            if !blockers.is_empty() {
                return blocked_item(product.sku.clone(), Some(target), None, None, blockers);
            }

            let mut diff = FieldDiff::new();
            diff.insert(
                "name".to_string(),
                FieldChange {
                    old: JsonValue::Null,
                    new: JsonValue::String(product.name.clone()),
                },
            );
            diff.insert(
                "price".to_string(),
                FieldChange {
                    old: JsonValue::Null,
                    new: json_decimal(product.price),
                },
            );
            diff.insert(
                "stock".to_string(),
                FieldChange {
                    old: JsonValue::Null,
                    new: JsonValue::from(product.stock),
                },
            );

            PreviewItem {
                sku: product.sku.clone(),
                product_id: Some(target),
                remote_product_id: None,
                remote_variation_id: None,
                action: ItemAction::Create,
                warnings: Vec::new(),
                blockers: Vec::new(),
                diff,
            }
        }
        Some(listing) => {
            let key = (
                listing.remote_product_id.unwrap_or_default(),
                listing.remote_variation_id,
            );
            let Some(remote) = remotes.get(&key) else {
                return blocked_item(
                    product.sku.clone(),
                    Some(target),
                    listing.remote_product_id,
                    listing.remote_variation_id,
                    vec!["REMOTE_NOT_FOUND".to_string()],
                );
            };
            if remote.product_type == RemoteProductType::Variable {
                return blocked_item(
                    product.sku.clone(),
                    Some(target),
                    listing.remote_product_id,
                    listing.remote_variation_id,
                    vec!["TYPE_UNSUPPORTED".to_string()],
                );
            }

            let mut diff = FieldDiff::new();
            let mut warnings = Vec::new();

            if remote.name.as_deref() != Some(product.name.as_str()) {
                diff.insert(
                    "name".to_string(),
                    FieldChange {
                        old: remote
                            .name
                            .clone()
                            .map_or(JsonValue::Null, JsonValue::String),
                        new: JsonValue::String(product.name.clone()),
                    },
                );
            }
            if let Some(price) = product.price {
                match compare_price(remote.regular_price, price, options.price_tolerance) {
                    PriceCmp::Equal => {}
                    PriceCmp::WithinTolerance => {
                        warnings.push("PRICE_WITHIN_TOLERANCE".to_string());
                    }
                    PriceCmp::Changed => {
                        diff.insert(
                            "price".to_string(),
                            FieldChange {
                                old: json_decimal(remote.regular_price),
                                new: json_decimal(Some(price)),
                            },
                        );
                    }
                }
            }
            if remote.stock_quantity != Some(product.stock) {
                diff.insert(
                    "stock".to_string(),
                    FieldChange {
                        old: remote
                            .stock_quantity
                            .map_or(JsonValue::Null, JsonValue::from),
                        new: JsonValue::from(product.stock),
                    },
                );
            }

            let action = if diff.is_empty() {
                ItemAction::Skip
            } else {
                ItemAction::Update
            };

            PreviewItem {
                sku: product.sku.clone(),
                product_id: Some(target),
                remote_product_id: listing.remote_product_id,
                remote_variation_id: listing.remote_variation_id,
                action,
                warnings,
                blockers: Vec::new(),
                diff,
            }
        }
    }
}

/// Compute a SYNC_PRICE or SYNC_STOCK preview.
///
/// Narrow diffs restricted to the single field family; unlinked targets
/// always block with `NOT_LINKED`.
pub fn compute_field_sync_preview(
    operation: SyncOperation,
    targets: &[ProductId],
    products: &HashMap<ProductId, ProductSnapshot>,
    listings: &HashMap<ProductId, ListingSnapshot>,
    remotes: &HashMap<(i64, Option<i64>), RemoteProduct>,
    options: &DiffOptions,
) -> Preview {
    debug_assert!(matches!(
        operation,
        SyncOperation::SyncPrice | SyncOperation::SyncStock
    ));

    let mut summary = PreviewSummary::default();
    let mut items = Vec::new();

    for target in dedup_targets(targets) {
        let item = classify_sync_target(
            operation,
            target,
            products.get(&target),
            listings.get(&target),
            remotes,
            options,
        );
        summary.record(item.action);
        items.push(item);
    }

    Preview {
        operation,
        summary,
        items,
    }
}

fn classify_sync_target(
    operation: SyncOperation,
    target: ProductId,
    product: Option<&ProductSnapshot>,
    listing: Option<&ListingSnapshot>,
    remotes: &HashMap<(i64, Option<i64>), RemoteProduct>,
    options: &DiffOptions,
) -> PreviewItem {
    if listing.map(|l| l.status) == Some(ListingStatus::Conflict) {
        return blocked_item(
            listing.and_then(|l| l.sku.clone()),
            Some(target),
            listing.and_then(|l| l.remote_product_id),
            listing.and_then(|l| l.remote_variation_id),
            vec!["CONFLICT".to_string()],
        );
    }

    let Some(listing) = listing.filter(|l| l.is_linked()) else {
        return blocked_item(
            product.and_then(|p| p.sku.clone()),
            Some(target),
            None,
            None,
            vec!["NOT_LINKED".to_string()],
        );
    };

    let Some(product) = product else {
        return blocked_item(
            listing.sku.clone(),
            Some(target),
            listing.remote_product_id,
            listing.remote_variation_id,
            vec!["PRODUCT_NOT_FOUND".to_string()],
        );
    };

    let key = (
        listing.remote_product_id.unwrap_or_default(),
        listing.remote_variation_id,
    );
    let Some(remote) = remotes.get(&key) else {
        return blocked_item(
            product.sku.clone(),
            Some(target),
            listing.remote_product_id,
            listing.remote_variation_id,
            vec!["REMOTE_NOT_FOUND".to_string()],
        );
    };

    let mut diff = FieldDiff::new();
    let mut warnings = Vec::new();
    let mut blockers = Vec::new();

    match operation {
        SyncOperation::SyncPrice => match product.price {
            None => blockers.push("PRICE_REQUIRED".to_string()),
            Some(price) => {
                match compare_price(remote.regular_price, price, options.price_tolerance) {
                    PriceCmp::Equal => {}
                    PriceCmp::WithinTolerance => {
                        warnings.push("PRICE_WITHIN_TOLERANCE".to_string());
                    }
                    PriceCmp::Changed => {
                        diff.insert(
                            "price".to_string(),
                            FieldChange {
                                old: json_decimal(remote.regular_price),
                                new: json_decimal(Some(price)),
                            },
                        );
                    }
                }
            }
        },
        SyncOperation::SyncStock => {
            if remote.stock_quantity != Some(product.stock) {
                diff.insert(
                    "stock".to_string(),
                    FieldChange {
                        old: remote
                            .stock_quantity
                            .map_or(JsonValue::Null, JsonValue::from),
                        new: JsonValue::from(product.stock),
                    },
                );
            }
        }
        _ => {}
    }

    let action = if !blockers.is_empty() {
        ItemAction::Block
    } else if diff.is_empty() {
        ItemAction::Skip
    } else {
        ItemAction::Update
    };

    PreviewItem {
        sku: product.sku.clone(),
        product_id: Some(target),
        remote_product_id: listing.remote_product_id,
        remote_variation_id: listing.remote_variation_id,
        action,
        warnings,
        blockers,
        diff,
    }
}

/// Compute an IMPORT preview (remote → internal), classified by remote id.
pub fn compute_import_preview(
    targets: &[i64],
    remotes: &HashMap<i64, RemoteProduct>,
    listings_by_remote: &HashMap<i64, ListingSnapshot>,
    products: &HashMap<ProductId, ProductSnapshot>,
    options: &DiffOptions,
) -> Preview {
    let mut summary = PreviewSummary::default();
    let mut items = Vec::new();

    for target in dedup_targets(targets) {
        let item = classify_import_target(
            target,
            remotes.get(&target),
            listings_by_remote.get(&target),
            products,
            options,
        );
        summary.record(item.action);
        items.push(item);
    }

    Preview {
        operation: SyncOperation::Import,
        summary,
        items,
    }
}

fn classify_import_target(
    target: i64,
    remote: Option<&RemoteProduct>,
    listing: Option<&ListingSnapshot>,
    products: &HashMap<ProductId, ProductSnapshot>,
    options: &DiffOptions,
) -> PreviewItem {
    if listing.map(|l| l.status) == Some(ListingStatus::Conflict) {
        return blocked_item(
            listing.and_then(|l| l.sku.clone()),
            listing.map(|l| l.product_id),
            Some(target),
            listing.and_then(|l| l.remote_variation_id),
            vec!["CONFLICT".to_string()],
        );
    }

    let Some(remote) = remote else {
        return blocked_item(
            None,
            None,
            Some(target),
            None,
            vec!["REMOTE_NOT_FOUND".to_string()],
        );
    };

    if remote.product_type == RemoteProductType::Variable {
        return blocked_item(
            remote.sku.clone(),
            None,
            Some(target),
            None,
            vec!["TYPE_UNSUPPORTED".to_string()],
        );
    }

    match listing.filter(|l| l.is_linked()) {
        None => {
            // No link: import materializes a new internal product.
            if remote.sku.as_deref().map_or(true, |s| s.trim().is_empty()) {
                return blocked_item(
                    None,
                    None,
                    Some(target),
                    remote.variation_id,
                    vec!["SKU_REQUIRED".to_string()],
                );
            }

            let mut diff = FieldDiff::new();
            diff.insert(
                "name".to_string(),
                FieldChange {
                    old: JsonValue::Null,
                    new: remote
                        .name
                        .clone()
                        .map_or(JsonValue::Null, JsonValue::String),
                },
            );
            diff.insert(
                "price".to_string(),
                FieldChange {
                    old: JsonValue::Null,
                    new: json_decimal(remote.regular_price),
                },
            );
            diff.insert(
                "stock".to_string(),
                FieldChange {
                    old: JsonValue::Null,
                    new: remote
                        .stock_quantity
                        .map_or(JsonValue::Null, JsonValue::from),
                },
            );

            PreviewItem {
                sku: remote.sku.clone(),
                product_id: None,
                remote_product_id: Some(target),
                remote_variation_id: remote.variation_id,
                action: ItemAction::Create,
                warnings: Vec::new(),
                blockers: Vec::new(),
                diff,
            }
        }
        Some(listing) => {
            let Some(product) = products.get(&listing.product_id) else {
                return blocked_item(
                    listing.sku.clone(),
                    Some(listing.product_id),
                    Some(target),
                    listing.remote_variation_id,
                    vec!["PRODUCT_NOT_FOUND".to_string()],
                );
            };

            let mut diff = FieldDiff::new();
            let mut warnings = Vec::new();

            if let Some(ref name) = remote.name {
                if name != &product.name {
                    diff.insert(
                        "name".to_string(),
                        FieldChange {
                            old: JsonValue::String(product.name.clone()),
                            new: JsonValue::String(name.clone()),
                        },
                    );
                }
            }
            if let Some(remote_price) = remote.regular_price {
                match compare_price(product.price, remote_price, options.price_tolerance) {
                    PriceCmp::Equal => {}
                    PriceCmp::WithinTolerance => {
                        warnings.push("PRICE_WITHIN_TOLERANCE".to_string());
                    }
                    PriceCmp::Changed => {
                        diff.insert(
                            "price".to_string(),
                            FieldChange {
                                old: json_decimal(product.price),
                                new: json_decimal(Some(remote_price)),
                            },
                        );
                    }
                }
            }
            if let Some(remote_stock) = remote.stock_quantity {
                if remote_stock != product.stock {
                    diff.insert(
                        "stock".to_string(),
                        FieldChange {
                            old: JsonValue::from(product.stock),
                            new: JsonValue::from(remote_stock),
                        },
                    );
                }
            }

            let action = if diff.is_empty() {
                ItemAction::Skip
            } else {
                ItemAction::Update
            };

            PreviewItem {
                sku: product.sku.clone().or_else(|| remote.sku.clone()),
                product_id: Some(listing.product_id),
                remote_product_id: Some(target),
                remote_variation_id: listing.remote_variation_id,
                action,
                warnings,
                blockers: Vec::new(),
                diff,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot assembly
// ---------------------------------------------------------------------------

/// Read-only service assembling snapshots and delegating to the pure core.
pub struct PreviewService {
    pool: PgPool,
    provider: Arc<dyn ConnectorProvider>,
}

impl PreviewService {
    /// Create a new preview service.
    pub fn new(pool: PgPool, provider: Arc<dyn ConnectorProvider>) -> Self {
        Self { pool, provider }
    }

    /// Compute a preview for any operation class.
    #[instrument(skip(self, options), fields(tenant = %tenant_id, store = %store_id, operation = %operation))]
    pub async fn preview(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        operation: SyncOperation,
        product_targets: &[ProductId],
        remote_targets: &[i64],
        options: &DiffOptions,
    ) -> CatalogResult<Preview> {
        match operation {
            SyncOperation::Import => {
                if remote_targets.is_empty() {
                    return Err(CatalogError::validation("target set must not be empty"));
                }
                self.preview_import(tenant_id, store_id, remote_targets, options)
                    .await
            }
            _ => {
                if product_targets.is_empty() {
                    return Err(CatalogError::validation("target set must not be empty"));
                }
                self.preview_internal(tenant_id, store_id, operation, product_targets, options)
                    .await
            }
        }
    }

    async fn preview_internal(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        operation: SyncOperation,
        targets: &[ProductId],
        options: &DiffOptions,
    ) -> CatalogResult<Preview> {
        let target_uuids: Vec<_> = targets.iter().map(|id| id.into_uuid()).collect();

        let products: HashMap<ProductId, ProductSnapshot> =
            Product::find_by_ids(&self.pool, tenant_id.into_uuid(), &target_uuids)
                .await?
                .iter()
                .map(|p| (ProductId::from_uuid(p.id), ProductSnapshot::from(p)))
                .collect();

        let listings: HashMap<ProductId, ListingSnapshot> = Listing::find_by_products(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            &target_uuids,
        )
        .await?
        .iter()
        .map(|l| (ProductId::from_uuid(l.product_id), ListingSnapshot::from(l)))
        .collect();

        let remotes = self
            .fetch_linked_remotes(tenant_id, store_id, listings.values())
            .await?;

        Ok(match operation {
            SyncOperation::Export => {
                compute_export_preview(targets, &products, &listings, &remotes, options)
            }
            _ => compute_field_sync_preview(
                operation, targets, &products, &listings, &remotes, options,
            ),
        })
    }

    /// Fetch the current remote state for every linked listing.
    async fn fetch_linked_remotes(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        listings: impl Iterator<Item = &ListingSnapshot>,
    ) -> CatalogResult<HashMap<(i64, Option<i64>), RemoteProduct>> {
        let linked: Vec<_> = listings.filter(|l| l.is_linked()).collect();
        if linked.is_empty() {
            return Ok(HashMap::new());
        }

        let connector = self.provider.connector_for_store(tenant_id, store_id).await?;
        let mut remotes = HashMap::new();
        for listing in linked {
            let product_id = listing.remote_product_id.unwrap_or_default();
            let fetched = match listing.remote_variation_id {
                Some(variation_id) => connector.get_variation(product_id, variation_id).await?,
                None => connector.get_product(product_id).await?,
            };
            if let Some(remote) = fetched {
                remotes.insert((product_id, listing.remote_variation_id), remote);
            }
        }
        Ok(remotes)
    }

    async fn preview_import(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        targets: &[i64],
        options: &DiffOptions,
    ) -> CatalogResult<Preview> {
        let connector = self.provider.connector_for_store(tenant_id, store_id).await?;

        let mut remotes = HashMap::new();
        for &target in targets {
            if remotes.contains_key(&target) {
                continue;
            }
            if let Some(remote) = connector.get_product(target).await? {
                remotes.insert(target, remote);
            }
        }

        let listings_by_remote: HashMap<i64, ListingSnapshot> = Listing::find_by_remote_products(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            targets,
        )
        .await?
        .iter()
        .filter_map(|l| l.remote_product_id.map(|rid| (rid, ListingSnapshot::from(l))))
        .collect();

        let linked_product_ids: Vec<_> = listings_by_remote
            .values()
            .map(|l| l.product_id.into_uuid())
            .collect();
        let products: HashMap<ProductId, ProductSnapshot> = if linked_product_ids.is_empty() {
            HashMap::new()
        } else {
            Product::find_by_ids(&self.pool, tenant_id.into_uuid(), &linked_product_ids)
                .await?
                .iter()
                .map(|p| (ProductId::from_uuid(p.id), ProductSnapshot::from(p)))
                .collect()
        };

        Ok(compute_import_preview(
            targets,
            &remotes,
            &listings_by_remote,
            &products,
            options,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: ProductId, sku: &str, price: &str, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            id,
            sku: Some(sku.to_string()),
            name: format!("Product {sku}"),
            price: Some(dec(price)),
            stock,
        }
    }

    fn linked_listing(product_id: ProductId, remote_id: i64) -> ListingSnapshot {
        ListingSnapshot {
            product_id,
            sku: Some("SKU".to_string()),
            remote_product_id: Some(remote_id),
            remote_variation_id: None,
            status: ListingStatus::Linked,
        }
    }

    fn remote(id: i64, sku: &str, name: &str, price: &str, stock: i32) -> RemoteProduct {
        RemoteProduct {
            id,
            variation_id: None,
            sku: Some(sku.to_string()),
            name: Some(name.to_string()),
            product_type: RemoteProductType::Simple,
            status: Some("publish".to_string()),
            regular_price: Some(dec(price)),
            stock_quantity: Some(stock),
            manage_stock: true,
            updated_at: None,
        }
    }

    #[test]
    fn test_dedup_targets_collapses_duplicates() {
        let a = ProductId::new();
        let b = ProductId::new();
        let deduped = dedup_targets(&[a, b, a, a, b]);
        assert_eq!(deduped, vec![a, b]);
    }

    #[test]
    fn test_export_unlisted_target_is_create() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "19.90", 5))]);
        let preview = compute_export_preview(
            &[id],
            &products,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );

        assert_eq!(preview.summary.create, 1);
        assert_eq!(preview.items[0].action, ItemAction::Create);
        assert_eq!(preview.items[0].diff["price"].new, JsonValue::String("19.90".into()));
    }

    #[test]
    fn test_export_create_blocked_on_missing_fields() {
        let id = ProductId::new();
        let mut snapshot = product(id, "SKU-1", "19.90", 5);
        snapshot.sku = None;
        snapshot.price = None;
        let products = HashMap::from([(id, snapshot)]);
        let preview = compute_export_preview(
            &[id],
            &products,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );

        assert_eq!(preview.summary.block, 1);
        let blockers = &preview.items[0].blockers;
        assert!(blockers.contains(&"SKU_REQUIRED".to_string()));
        assert!(blockers.contains(&"PRICE_REQUIRED".to_string()));
    }

    #[test]
    fn test_export_linked_equal_is_skip() {
        let id = ProductId::new();
        let snapshot = product(id, "SKU-1", "19.90", 5);
        let name = snapshot.name.clone();
        let products = HashMap::from([(id, snapshot)]);
        let listings = HashMap::from([(id, linked_listing(id, 42))]);
        let remotes = HashMap::from([((42, None), remote(42, "SKU-1", &name, "19.90", 5))]);

        let preview =
            compute_export_preview(&[id], &products, &listings, &remotes, &DiffOptions::default());
        assert_eq!(preview.summary.skip, 1);
        assert!(preview.items[0].diff.is_empty());
    }

    #[test]
    fn test_conflict_always_blocks() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "19.90", 5))]);
        let mut listing = linked_listing(id, 42);
        listing.status = ListingStatus::Conflict;
        let listings = HashMap::from([(id, listing)]);

        for operation in [SyncOperation::SyncPrice, SyncOperation::SyncStock] {
            let preview = compute_field_sync_preview(
                operation,
                &[id],
                &products,
                &listings,
                &HashMap::new(),
                &DiffOptions::default(),
            );
            assert_eq!(preview.summary.block, 1, "{operation} must block");
            assert_eq!(preview.items[0].blockers, vec!["CONFLICT".to_string()]);
        }

        let preview = compute_export_preview(
            &[id],
            &products,
            &listings,
            &HashMap::new(),
            &DiffOptions::default(),
        );
        assert_eq!(preview.summary.block, 1);
    }

    #[test]
    fn test_sync_price_unlinked_is_not_linked_block() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "19.90", 5))]);
        let preview = compute_field_sync_preview(
            SyncOperation::SyncPrice,
            &[id],
            &products,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );
        assert_eq!(preview.summary.block, 1);
        assert_eq!(preview.items[0].blockers, vec!["NOT_LINKED".to_string()]);
    }

    #[test]
    fn test_sync_price_diff_shape() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "21.00", 5))]);
        let listings = HashMap::from([(id, linked_listing(id, 42))]);
        let remotes = HashMap::from([((42, None), remote(42, "SKU-1", "n", "19.90", 5))]);

        let preview = compute_field_sync_preview(
            SyncOperation::SyncPrice,
            &[id],
            &products,
            &listings,
            &remotes,
            &DiffOptions::default(),
        );

        assert_eq!(preview.summary.update, 1);
        let change = &preview.items[0].diff["price"];
        assert_eq!(change.old, JsonValue::String("19.90".into()));
        assert_eq!(change.new, JsonValue::String("21.00".into()));
    }

    #[test]
    fn test_sync_price_equal_is_skip() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "19.90", 5))]);
        let listings = HashMap::from([(id, linked_listing(id, 42))]);
        let remotes = HashMap::from([((42, None), remote(42, "SKU-1", "n", "19.90", 5))]);

        let preview = compute_field_sync_preview(
            SyncOperation::SyncPrice,
            &[id],
            &products,
            &listings,
            &remotes,
            &DiffOptions::default(),
        );
        assert_eq!(preview.summary.skip, 1);
    }

    #[test]
    fn test_price_tolerance_downgrades_to_skip_with_warning() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "19.91", 5))]);
        let listings = HashMap::from([(id, linked_listing(id, 42))]);
        let remotes = HashMap::from([((42, None), remote(42, "SKU-1", "n", "19.90", 5))]);

        let options = DiffOptions {
            price_tolerance: dec("0.05"),
        };
        let preview = compute_field_sync_preview(
            SyncOperation::SyncPrice,
            &[id],
            &products,
            &listings,
            &remotes,
            &options,
        );
        assert_eq!(preview.summary.skip, 1);
        assert_eq!(
            preview.items[0].warnings,
            vec!["PRICE_WITHIN_TOLERANCE".to_string()]
        );
    }

    #[test]
    fn test_summary_equals_deduped_target_count() {
        let a = ProductId::new();
        let b = ProductId::new();
        let c = ProductId::new();
        let products = HashMap::from([
            (a, product(a, "A", "1.00", 1)),
            (b, product(b, "B", "2.00", 2)),
        ]);
        // c has no product row; a/b have no listings. Duplicated targets.
        let preview = compute_export_preview(
            &[a, b, c, a, b, c],
            &products,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );

        assert_eq!(preview.summary.total(), 3);
        assert_eq!(preview.items.len(), 3);
    }

    #[test]
    fn test_preview_is_deterministic() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "21.00", 9))]);
        let listings = HashMap::from([(id, linked_listing(id, 42))]);
        let remotes = HashMap::from([((42, None), remote(42, "SKU-1", "n", "19.90", 5))]);

        let first = compute_export_preview(
            &[id],
            &products,
            &listings,
            &remotes,
            &DiffOptions::default(),
        );
        let second = compute_export_preview(
            &[id],
            &products,
            &listings,
            &remotes,
            &DiffOptions::default(),
        );

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_import_unlinked_remote_is_create() {
        let remotes = HashMap::from([(42, remote(42, "SKU-9", "Imported", "12.00", 3))]);
        let preview = compute_import_preview(
            &[42],
            &remotes,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );
        assert_eq!(preview.summary.create, 1);
        assert_eq!(preview.items[0].remote_product_id, Some(42));
        assert_eq!(preview.items[0].diff["name"].new, JsonValue::String("Imported".into()));
    }

    #[test]
    fn test_import_missing_remote_blocks() {
        let preview = compute_import_preview(
            &[42],
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );
        assert_eq!(preview.summary.block, 1);
        assert_eq!(
            preview.items[0].blockers,
            vec!["REMOTE_NOT_FOUND".to_string()]
        );
    }

    #[test]
    fn test_import_linked_diff_direction_is_remote_wins() {
        let pid = ProductId::new();
        let products = HashMap::from([(pid, product(pid, "SKU-1", "10.00", 5))]);
        let listings = HashMap::from([(42i64, linked_listing(pid, 42))]);
        let remotes = HashMap::from([(42i64, remote(42, "SKU-1", "Product SKU-1", "12.00", 5))]);

        let preview =
            compute_import_preview(&[42], &remotes, &listings, &products, &DiffOptions::default());
        assert_eq!(preview.summary.update, 1);
        let change = &preview.items[0].diff["price"];
        assert_eq!(change.old, JsonValue::String("10.00".into()));
        assert_eq!(change.new, JsonValue::String("12.00".into()));
    }

    #[test]
    fn test_variable_parent_blocks() {
        let mut parent = remote(42, "SKU-P", "Parent", "0.00", 0);
        parent.product_type = RemoteProductType::Variable;
        let remotes = HashMap::from([(42, parent)]);
        let preview = compute_import_preview(
            &[42],
            &remotes,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );
        assert_eq!(preview.items[0].blockers, vec!["TYPE_UNSUPPORTED".to_string()]);
    }

    #[test]
    fn test_to_run_item_finalizes_non_actionable() {
        let id = ProductId::new();
        let products = HashMap::from([(id, product(id, "SKU-1", "19.90", 5))]);
        let preview = compute_field_sync_preview(
            SyncOperation::SyncPrice,
            &[id],
            &products,
            &HashMap::new(),
            &HashMap::new(),
            &DiffOptions::default(),
        );
        let item = preview.items[0].to_run_item(3);
        assert_eq!(item.action, ItemAction::Block);
        assert_eq!(item.status, ItemStatus::Skipped);
        assert_eq!(item.max_attempts, 3);
    }
}
