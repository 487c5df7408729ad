//! API error types and the uniform response envelope.
//!
//! Every failure serializes as `{"ok": false, "error": <code>, "hint":
//! <bounded text>}` with a mapped HTTP status, mirroring the success
//! envelope's `"ok": true`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use storelink_catalog::config::truncate_hint;
use storelink_catalog::error::CatalogError;
use storelink_connector::error::ConnectorError;
use storelink_core::CoreError;

/// Error type for catalog API operations.
#[derive(Debug, Error)]
pub enum CatalogApiError {
    /// Store not found for the tenant.
    #[error("store not found: {0}")]
    StoreNotFound(Uuid),

    /// Run not found for the store.
    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    /// Listing not found for the product.
    #[error("listing not found for product {0}")]
    ListingNotFound(Uuid),

    /// Generic resource not found.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// Invalid run state for the requested transition.
    #[error("invalid run state for {run_id}: cannot {action} from {current_state}")]
    InvalidRunState {
        run_id: Uuid,
        current_state: String,
        action: String,
    },

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tenant isolation violation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Storefront connector failure.
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogApiError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogApiError::Validation(message.into())
    }

    fn parts(&self) -> (StatusCode, String, Option<String>) {
        match self {
            CatalogApiError::StoreNotFound(_) => (
                StatusCode::NOT_FOUND,
                "STORE_NOT_FOUND".to_string(),
                Some(self.to_string()),
            ),
            CatalogApiError::RunNotFound(_) => (
                StatusCode::NOT_FOUND,
                "RUN_NOT_FOUND".to_string(),
                Some(self.to_string()),
            ),
            CatalogApiError::ListingNotFound(_) => (
                StatusCode::NOT_FOUND,
                "LISTING_NOT_FOUND".to_string(),
                Some(self.to_string()),
            ),
            CatalogApiError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND".to_string(),
                Some(self.to_string()),
            ),
            CatalogApiError::InvalidRunState { .. } => (
                StatusCode::BAD_REQUEST,
                "INVALID_RUN_STATE".to_string(),
                Some(self.to_string()),
            ),
            CatalogApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                Some(message.clone()),
            ),
            CatalogApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN".to_string(),
                Some(message.clone()),
            ),
            CatalogApiError::Connector(e) => {
                let status = if e.is_transient() {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                };
                (status, e.error_code().to_string(), Some(e.to_string()))
            }
            CatalogApiError::Database(e) => {
                error!(error = ?e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR".to_string(),
                    None,
                )
            }
            CatalogApiError::Internal(message) => {
                error!(message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
                    None,
                )
            }
        }
    }
}

impl IntoResponse for CatalogApiError {
    fn into_response(self) -> Response {
        let (status, code, hint) = self.parts();
        let body = json!({
            "ok": false,
            "error": code,
            "hint": hint.map(|h| truncate_hint(&h)),
        });
        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for CatalogApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Database(e) => CatalogApiError::Database(e),
            CatalogError::Connector(e) => CatalogApiError::Connector(e),
            CatalogError::StoreNotFound(id) => CatalogApiError::StoreNotFound(id),
            CatalogError::RunNotFound(id) => CatalogApiError::RunNotFound(id),
            CatalogError::InvalidRunState {
                run_id,
                current_state,
                action,
            } => CatalogApiError::InvalidRunState {
                run_id,
                current_state,
                action,
            },
            CatalogError::Validation(message) => CatalogApiError::Validation(message),
        }
    }
}

impl From<CoreError> for CatalogApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { resource, id } => CatalogApiError::NotFound { resource, id },
            CoreError::TenantMismatch { .. } => CatalogApiError::Forbidden(err.to_string()),
            CoreError::Validation { field, message } => {
                CatalogApiError::Validation(format!("{field}: {message}"))
            }
        }
    }
}

/// Result type for catalog API operations.
pub type Result<T> = std::result::Result<T, CatalogApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let (status, code, hint) = CatalogApiError::validation("empty target set").parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");
        assert_eq!(hint.as_deref(), Some("empty target set"));
    }

    #[test]
    fn test_transient_connector_error_maps_to_502() {
        let err = CatalogApiError::Connector(ConnectorError::RateLimited {
            retry_after_secs: None,
        });
        let (status, code, _) = err.parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(code, "RATE_LIMITED");
    }

    #[test]
    fn test_permanent_connector_error_maps_to_422() {
        let err = CatalogApiError::Connector(ConnectorError::invalid_data("nope"));
        let (status, code, _) = err.parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "INVALID_DATA");
    }

    #[test]
    fn test_database_error_hides_details() {
        let err = CatalogApiError::Database(sqlx::Error::RowNotFound);
        let (status, code, hint) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "DATABASE_ERROR");
        assert!(hint.is_none());
    }

    #[test]
    fn test_catalog_error_conversion() {
        let id = Uuid::new_v4();
        let err: CatalogApiError = CatalogError::RunNotFound(id).into();
        assert!(matches!(err, CatalogApiError::RunNotFound(got) if got == id));
    }
}
