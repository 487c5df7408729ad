//! Engine error types.

use thiserror::Error;
use uuid::Uuid;

use storelink_connector::error::ConnectorError;

/// Errors raised by the synchronization engine.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storefront connector error.
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Store not found for the tenant.
    #[error("store not found: {0}")]
    StoreNotFound(Uuid),

    /// Run not found for the store.
    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    /// The run is not in a state that allows the requested transition.
    #[error("invalid run state for {run_id}: cannot {action} from {current_state}")]
    InvalidRunState {
        run_id: Uuid,
        current_state: String,
        action: String,
    },

    /// Caller input rejected before any durable state was created.
    #[error("validation error: {0}")]
    Validation(String),
}

impl CatalogError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }
}

/// Result type for engine operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
