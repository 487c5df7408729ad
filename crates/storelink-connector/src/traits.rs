//! Connector capability traits
//!
//! Capability-based trait definitions for storefront connectors. The sync
//! engine only ever talks to these traits; concrete adapters (WooCommerce
//! REST, test mocks) implement the subset they support.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::types::{NewRemoteProduct, RemoteProduct, RemoteProductPatch};

/// Base trait for all storefront connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the storefront.
    ///
    /// Returns `Ok(())` if the storefront answered a lightweight probe, or
    /// an error describing what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// Capability for reading the storefront catalog.
#[async_trait]
pub trait ProductSearch: Connector {
    /// Find all products (including variations) carrying the given SKU.
    ///
    /// SKUs are not guaranteed unique on the storefront side; callers must
    /// handle zero, one and many matches.
    async fn search_by_sku(&self, sku: &str) -> ConnectorResult<Vec<RemoteProduct>>;

    /// Free-text product search with pagination, for catalog browsing.
    async fn search_products(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> ConnectorResult<Vec<RemoteProduct>>;

    /// Fetch a single product by its storefront id.
    ///
    /// Returns `None` when the product does not exist (as opposed to a
    /// transport failure, which is an error).
    async fn get_product(&self, product_id: i64) -> ConnectorResult<Option<RemoteProduct>>;

    /// Fetch a single variation of a variable product.
    async fn get_variation(
        &self,
        product_id: i64,
        variation_id: i64,
    ) -> ConnectorResult<Option<RemoteProduct>>;
}

/// Capability for writing to the storefront catalog.
#[async_trait]
pub trait ProductWrite: Connector {
    /// Create a new product on the storefront.
    ///
    /// Returns the created record including the storefront-assigned id.
    async fn create_product(&self, product: NewRemoteProduct) -> ConnectorResult<RemoteProduct>;

    /// Apply a partial update to an existing product.
    async fn update_product(
        &self,
        product_id: i64,
        patch: RemoteProductPatch,
    ) -> ConnectorResult<RemoteProduct>;

    /// Apply a partial update to a variation of a variable product.
    async fn update_variation(
        &self,
        product_id: i64,
        variation_id: i64,
        patch: RemoteProductPatch,
    ) -> ConnectorResult<RemoteProduct>;
}

/// Umbrella trait for connectors offering the full catalog surface the
/// sync engine needs. Blanket-implemented for anything with both
/// capabilities.
pub trait StorefrontApi: ProductSearch + ProductWrite {}

impl<T: ProductSearch + ProductWrite> StorefrontApi for T {}
