//! Listing registry: the canonical link state between internal products
//! and their storefront counterparts.
//!
//! Link classification is a pure function over the connector's SKU matches
//! and the listings already pointing at the matched identity; the service
//! wraps it with the durable upsert. Conflicts are never auto-resolved.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use storelink_connector::traits::ProductSearch;
use storelink_connector::types::{RemoteProduct, RemoteProductType};
use storelink_core::{ProductId, StoreId, TenantId};
use storelink_db::models::{Listing, ListingStatus};

use crate::error::CatalogResult;
use crate::provider::ConnectorProvider;

/// Outcome of a link-by-SKU attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResult {
    /// Resulting listing status.
    pub status: ListingStatus,
    /// The internal product already holding the matched remote identity,
    /// when the attempt detected a cross-link conflict.
    pub conflicting_product_id: Option<ProductId>,
}

/// How a set of SKU matches classifies for linking.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkClassification {
    /// No remote product carries the SKU.
    NoMatch,
    /// More than one remote product carries the SKU; no automatic pick.
    Ambiguous,
    /// The matched identity is already linked to a different product.
    LinkedElsewhere {
        other_product_id: ProductId,
        remote_product_id: i64,
        remote_variation_id: Option<i64>,
    },
    /// Exactly one usable match, free to link.
    Linkable {
        remote_product_id: i64,
        remote_variation_id: Option<i64>,
    },
}

/// Classify SKU matches against the listings already holding them.
///
/// `holders` are listings that point at the single match's identity.
fn classify_matches(
    product_id: ProductId,
    matches: &[RemoteProduct],
    holders: &[Listing],
) -> LinkClassification {
    let usable: Vec<_> = matches
        .iter()
        .filter(|m| m.product_type != RemoteProductType::Variable)
        .collect();

    match usable.as_slice() {
        [] => LinkClassification::NoMatch,
        [single] => {
            let (remote_product_id, remote_variation_id) = single.identity();
            let other = holders.iter().find(|l| {
                ProductId::from_uuid(l.product_id) != product_id
                    && l.status() == ListingStatus::Linked
            });
            match other {
                Some(other) => LinkClassification::LinkedElsewhere {
                    other_product_id: ProductId::from_uuid(other.product_id),
                    remote_product_id,
                    remote_variation_id,
                },
                None => LinkClassification::Linkable {
                    remote_product_id,
                    remote_variation_id,
                },
            }
        }
        _ => LinkClassification::Ambiguous,
    }
}

/// The listing registry service.
pub struct ListingRegistry {
    pool: PgPool,
    provider: Arc<dyn ConnectorProvider>,
}

impl ListingRegistry {
    /// Create a new registry.
    pub fn new(pool: PgPool, provider: Arc<dyn ConnectorProvider>) -> Self {
        Self { pool, provider }
    }

    /// Link an internal product to its storefront counterpart by SKU.
    ///
    /// Idempotent: relinking an already-linked pair is a no-op returning
    /// the current status. A connector failure surfaces before any state
    /// is touched.
    #[instrument(skip(self), fields(tenant = %tenant_id, store = %store_id, product = %product_id))]
    pub async fn link_by_sku(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        product_id: ProductId,
        sku: &str,
    ) -> CatalogResult<LinkResult> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(crate::error::CatalogError::validation("sku must not be empty"));
        }

        let connector = self
            .provider
            .connector_for_store(tenant_id, store_id)
            .await?;
        let matches = connector.search_by_sku(sku).await?;

        // Load the listings already holding the matched identity, if any.
        let holders = match matches.as_slice() {
            [single] if single.product_type != RemoteProductType::Variable => {
                let (remote_id, variation_id) = single.identity();
                Listing::find_by_remote(
                    &self.pool,
                    tenant_id.into_uuid(),
                    store_id.into_uuid(),
                    remote_id,
                    variation_id,
                )
                .await?
            }
            _ => Vec::new(),
        };

        match classify_matches(product_id, &matches, &holders) {
            LinkClassification::NoMatch => {
                Listing::upsert(
                    &self.pool,
                    tenant_id.into_uuid(),
                    store_id.into_uuid(),
                    product_id.into_uuid(),
                    Some(sku),
                    None,
                    None,
                    ListingStatus::Unlinked,
                )
                .await?;
                Ok(LinkResult {
                    status: ListingStatus::Unlinked,
                    conflicting_product_id: None,
                })
            }
            LinkClassification::Ambiguous => {
                warn!(sku, "ambiguous SKU match, marking conflict");
                Listing::upsert(
                    &self.pool,
                    tenant_id.into_uuid(),
                    store_id.into_uuid(),
                    product_id.into_uuid(),
                    Some(sku),
                    None,
                    None,
                    ListingStatus::Conflict,
                )
                .await?;
                Ok(LinkResult {
                    status: ListingStatus::Conflict,
                    conflicting_product_id: None,
                })
            }
            LinkClassification::LinkedElsewhere {
                other_product_id,
                remote_product_id,
                remote_variation_id,
            } => {
                warn!(
                    sku,
                    other_product = %other_product_id,
                    "remote identity already linked elsewhere, marking conflict"
                );
                Listing::upsert(
                    &self.pool,
                    tenant_id.into_uuid(),
                    store_id.into_uuid(),
                    product_id.into_uuid(),
                    Some(sku),
                    Some(remote_product_id),
                    remote_variation_id,
                    ListingStatus::Conflict,
                )
                .await?;
                // Both sides of the conflict need resolution.
                Listing::upsert(
                    &self.pool,
                    tenant_id.into_uuid(),
                    store_id.into_uuid(),
                    other_product_id.into_uuid(),
                    None,
                    Some(remote_product_id),
                    remote_variation_id,
                    ListingStatus::Conflict,
                )
                .await?;
                Ok(LinkResult {
                    status: ListingStatus::Conflict,
                    conflicting_product_id: Some(other_product_id),
                })
            }
            LinkClassification::Linkable {
                remote_product_id,
                remote_variation_id,
            } => {
                let listing = Listing::upsert(
                    &self.pool,
                    tenant_id.into_uuid(),
                    store_id.into_uuid(),
                    product_id.into_uuid(),
                    Some(sku),
                    Some(remote_product_id),
                    remote_variation_id,
                    ListingStatus::Linked,
                )
                .await?;
                info!(sku, listing_id = %listing.id, "product linked");
                Ok(LinkResult {
                    status: ListingStatus::Linked,
                    conflicting_product_id: None,
                })
            }
        }
    }

    /// Unlink a product, preserving the listing row for audit history.
    ///
    /// A no-op returning `unlinked` when no listing exists.
    #[instrument(skip(self), fields(tenant = %tenant_id, store = %store_id, product = %product_id))]
    pub async fn unlink(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        product_id: ProductId,
    ) -> CatalogResult<ListingStatus> {
        let unlinked = Listing::unlink(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            product_id.into_uuid(),
        )
        .await?;
        if unlinked.is_some() {
            info!("product unlinked");
        }
        Ok(ListingStatus::Unlinked)
    }

    /// Look up the listing for one product.
    pub async fn get_by_product(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        product_id: ProductId,
    ) -> CatalogResult<Option<Listing>> {
        Ok(Listing::find_by_product(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            product_id.into_uuid(),
        )
        .await?)
    }

    /// Look up the listings for a set of products.
    pub async fn get_by_products(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> CatalogResult<Vec<Listing>> {
        let ids: Vec<Uuid> = product_ids.iter().map(|id| id.into_uuid()).collect();
        Ok(Listing::find_by_products(
            &self.pool,
            tenant_id.into_uuid(),
            store_id.into_uuid(),
            &ids,
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn remote(id: i64, sku: &str) -> RemoteProduct {
        RemoteProduct {
            id,
            variation_id: None,
            sku: Some(sku.to_string()),
            name: Some("X".to_string()),
            product_type: RemoteProductType::Simple,
            status: Some("publish".to_string()),
            regular_price: None,
            stock_quantity: None,
            manage_stock: false,
            updated_at: None,
        }
    }

    fn listing_row(product_id: ProductId, remote_id: i64, status: ListingStatus) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            product_id: product_id.into_uuid(),
            sku: None,
            remote_product_id: Some(remote_id),
            remote_variation_id: None,
            status: status.to_string(),
            last_price_sync_at: None,
            last_stock_sync_at: None,
            last_error_code: None,
            last_error_hint: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_match_classifies_unlinked() {
        let result = classify_matches(ProductId::new(), &[], &[]);
        assert_eq!(result, LinkClassification::NoMatch);
    }

    #[test]
    fn test_multiple_matches_are_ambiguous() {
        let matches = vec![remote(1, "SKU-1"), remote(2, "SKU-1")];
        let result = classify_matches(ProductId::new(), &matches, &[]);
        assert_eq!(result, LinkClassification::Ambiguous);
    }

    #[test]
    fn test_single_match_is_linkable() {
        let matches = vec![remote(7, "SKU-1")];
        let result = classify_matches(ProductId::new(), &matches, &[]);
        assert_eq!(
            result,
            LinkClassification::Linkable {
                remote_product_id: 7,
                remote_variation_id: None
            }
        );
    }

    #[test]
    fn test_variable_parents_do_not_count_as_matches() {
        let mut parent = remote(7, "SKU-1");
        parent.product_type = RemoteProductType::Variable;
        let result = classify_matches(ProductId::new(), &[parent], &[]);
        assert_eq!(result, LinkClassification::NoMatch);
    }

    #[test]
    fn test_identity_held_elsewhere_is_conflict() {
        let me = ProductId::new();
        let other = ProductId::new();
        let matches = vec![remote(7, "SKU-1")];
        let holders = vec![listing_row(other, 7, ListingStatus::Linked)];

        let result = classify_matches(me, &matches, &holders);
        assert_eq!(
            result,
            LinkClassification::LinkedElsewhere {
                other_product_id: other,
                remote_product_id: 7,
                remote_variation_id: None
            }
        );
    }

    #[test]
    fn test_relink_same_product_is_linkable() {
        // The holder is the product itself: idempotent relink.
        let me = ProductId::new();
        let matches = vec![remote(7, "SKU-1")];
        let holders = vec![listing_row(me, 7, ListingStatus::Linked)];

        let result = classify_matches(me, &matches, &holders);
        assert_eq!(
            result,
            LinkClassification::Linkable {
                remote_product_id: 7,
                remote_variation_id: None
            }
        );
    }

    #[test]
    fn test_unlinked_holder_does_not_conflict() {
        let me = ProductId::new();
        let other = ProductId::new();
        let matches = vec![remote(7, "SKU-1")];
        // A holder row that is no longer `linked` does not block the link.
        let holders = vec![listing_row(other, 7, ListingStatus::Error)];

        let result = classify_matches(me, &matches, &holders);
        assert!(matches!(result, LinkClassification::Linkable { .. }));
    }
}
