//! Error Types
//!
//! Standardized error type shared by the storelink crates.
//!
//! # Example
//!
//! ```
//! use storelink_core::{CoreError, Result};
//!
//! fn find_store(id: &str) -> Result<String> {
//!     if id.is_empty() {
//!         return Err(CoreError::NotFound {
//!             resource: "Store".to_string(),
//!             id: None,
//!         });
//!     }
//!     Ok(format!("Store {}", id))
//! }
//! ```

use crate::ids::TenantId;
use serde::Serialize;
use thiserror::Error;

/// Standardized error type for storelink.
///
/// Each variant maps to a common failure scenario and converts cleanly to
/// an HTTP status at the API boundary.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreError {
    /// Requested resource was not found.
    ///
    /// Use when a database lookup returns no results. Maps to HTTP 404.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// The type of resource that was not found (e.g., "Run", "Listing").
        resource: String,
        /// Optional identifier of the resource.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Tenant isolation violation.
    ///
    /// Use when an operation attempts to access data from a different
    /// tenant. This is a critical security error. Maps to HTTP 403.
    #[error("Tenant mismatch: expected {expected}, got {actual}")]
    TenantMismatch {
        /// The expected tenant ID.
        expected: TenantId,
        /// The actual tenant ID that was provided.
        actual: TenantId,
    },

    /// Input validation failure.
    ///
    /// Use when caller input fails validation rules. Maps to HTTP 400.
    #[error("Validation error on field '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Description of the validation failure.
        message: String,
    },
}

impl CoreError {
    /// Create a not-found error for a resource type.
    pub fn not_found(resource: impl Into<String>) -> Self {
        CoreError::NotFound {
            resource: resource.into(),
            id: None,
        }
    }

    /// Create a not-found error carrying the missing id.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            resource: resource.into(),
            id: Some(id.to_string()),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Type alias for Results using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_without_id() {
        let error = CoreError::not_found("Run");
        assert_eq!(error.to_string(), "Run not found");
    }

    #[test]
    fn test_not_found_display_with_id() {
        let error = CoreError::not_found_with_id("Listing", "abc-123");
        assert_eq!(error.to_string(), "Listing not found: abc-123");
    }

    #[test]
    fn test_tenant_mismatch_display() {
        let expected = TenantId::new();
        let actual = TenantId::new();
        let error = CoreError::TenantMismatch { expected, actual };

        let display = error.to_string();
        assert!(display.contains("Tenant mismatch"));
        assert!(display.contains("expected"));
        assert!(display.contains("got"));
    }

    #[test]
    fn test_validation_display_format() {
        let error = CoreError::validation("limit", "must be positive");
        assert_eq!(
            error.to_string(),
            "Validation error on field 'limit': must be positive"
        );
    }

    #[test]
    fn test_serialization_is_tagged() {
        let error = CoreError::validation("sku", "required");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"validation\""));
        assert!(json.contains("\"field\":\"sku\""));
    }

    #[test]
    fn test_question_mark_propagation() {
        fn inner() -> Result<()> {
            Err(CoreError::not_found("Store"))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        assert!(outer().is_err());
    }
}
