//! Composition root for storefront connectors.
//!
//! Builds a WooCommerce connector from the durable store settings. This is
//! the only place where the API crate knows which concrete adapter backs a
//! store.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use storelink_catalog::provider::ConnectorProvider;
use storelink_connector::error::{ConnectorError, ConnectorResult};
use storelink_connector::traits::StorefrontApi;
use storelink_connector_woo::{WooConfig, WooConnector};
use storelink_core::{StoreId, TenantId};
use storelink_db::models::Store;

/// Provider resolving WooCommerce connectors from the store registry.
pub struct WooStoreProvider {
    pool: PgPool,
}

impl WooStoreProvider {
    /// Create a new provider.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectorProvider for WooStoreProvider {
    async fn connector_for_store(
        &self,
        tenant_id: TenantId,
        store_id: StoreId,
    ) -> ConnectorResult<Arc<dyn StorefrontApi>> {
        let store = Store::find_by_id(&self.pool, tenant_id.into_uuid(), store_id.into_uuid())
            .await
            .map_err(|e| ConnectorError::Internal {
                message: "failed to load store".to_string(),
                source: Some(Box::new(e)),
            })?
            .ok_or_else(|| ConnectorError::InvalidConfiguration {
                message: format!("store not found: {store_id}"),
            })?;

        if !store.is_active() {
            return Err(ConnectorError::StoreNotActive {
                status: store.status.clone(),
            });
        }

        let auth_mode = store.auth_mode.parse().unwrap_or_default();
        let config = WooConfig::new(
            &store.base_url,
            auth_mode,
            store.consumer_key.clone(),
            store.consumer_secret.clone(),
        )?;

        debug!(store = %store_id, base_url = %config.base_url, "connector resolved");
        Ok(Arc::new(WooConnector::new(config)?))
    }
}
