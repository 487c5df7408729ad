//! Connector resolution.
//!
//! The engine never constructs storefront connectors itself; a provider
//! resolves the connector for a store. The composition root supplies an
//! implementation that loads store settings and builds the real adapter;
//! tests supply mocks.

use async_trait::async_trait;
use std::sync::Arc;

use storelink_connector::error::ConnectorResult;
use storelink_connector::traits::StorefrontApi;
use storelink_core::{StoreId, TenantId};

/// Resolves the storefront connector for a store.
#[async_trait]
pub trait ConnectorProvider: Send + Sync {
    /// Get a connector for the given store.
    ///
    /// Implementations must refuse stores that are not active with
    /// [`storelink_connector::ConnectorError::StoreNotActive`].
    async fn connector_for_store(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
    ) -> ConnectorResult<Arc<dyn StorefrontApi>>;
}
