//! Connector error types
//!
//! Error definitions with transient/permanent classification for retry logic.

use thiserror::Error;

/// Error that can occur during storefront connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (transient)
    /// Failed to establish connection to the storefront.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// The storefront answered with a rate-limit response (HTTP 429).
    #[error("rate limited by storefront{}", retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// The storefront answered with a server error (HTTP 5xx).
    #[error("storefront server error: HTTP {status}")]
    ServerError { status: u16, body: Option<String> },

    /// Network error during communication.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Authentication errors (permanent)
    /// Invalid credentials.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Insufficient permissions for the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Configuration errors (permanent)
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The store is not in an active state.
    #[error("store is not active (current status: {status})")]
    StoreNotActive { status: String },

    // Semantic rejections from the storefront (permanent)
    /// Object already exists in the storefront (create conflict).
    #[error("object already exists: {identifier}")]
    ObjectAlreadyExists { identifier: String },

    /// Object not found in the storefront (update target missing).
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// The storefront rejected the payload (4xx semantic rejection).
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Other HTTP 4xx rejection, with the storefront's own error code.
    #[error("storefront rejected request: HTTP {status} {code}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    // Internal errors
    /// Serialization of a request or response body failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Check if this error is transient and the operation should be retried.
    ///
    /// Transient errors are those caused by temporary conditions that may
    /// resolve themselves, such as network issues, timeouts, rate limiting
    /// or storefront server errors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::RateLimited { .. }
                | ConnectorError::ServerError { .. }
                | ConnectorError::Network { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    ///
    /// Permanent errors require human intervention or data changes.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get a machine-readable error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::RateLimited { .. } => "RATE_LIMITED",
            ConnectorError::ServerError { .. } => "SERVER_ERROR",
            ConnectorError::Network { .. } => "NETWORK_ERROR",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::StoreNotActive { .. } => "STORE_NOT_ACTIVE",
            ConnectorError::ObjectAlreadyExists { .. } => "OBJECT_EXISTS",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::Rejected { .. } => "REJECTED",
            ConnectorError::Serialization { .. } => "SERIALIZATION_ERROR",
            ConnectorError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ConnectorError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ConnectorError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        ConnectorError::Serialization {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let transient_errors = vec![
            ConnectorError::connection_failed("test"),
            ConnectorError::ConnectionTimeout { timeout_secs: 30 },
            ConnectorError::RateLimited {
                retry_after_secs: Some(10),
            },
            ConnectorError::ServerError {
                status: 502,
                body: None,
            },
            ConnectorError::network("test"),
        ];

        for err in transient_errors {
            assert!(
                err.is_transient(),
                "Expected {} to be transient",
                err.error_code()
            );
            assert!(
                !err.is_permanent(),
                "Expected {} to not be permanent",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_permanent_errors() {
        let permanent_errors = vec![
            ConnectorError::AuthenticationFailed,
            ConnectorError::AuthorizationFailed {
                operation: "create".to_string(),
            },
            ConnectorError::InvalidConfiguration {
                message: "test".to_string(),
            },
            ConnectorError::StoreNotActive {
                status: "error".to_string(),
            },
            ConnectorError::ObjectAlreadyExists {
                identifier: "SKU-1".to_string(),
            },
            ConnectorError::ObjectNotFound {
                identifier: "4711".to_string(),
            },
            ConnectorError::invalid_data("bad payload"),
            ConnectorError::Rejected {
                status: 400,
                code: "woocommerce_rest_invalid_product".to_string(),
                message: "test".to_string(),
            },
        ];

        for err in permanent_errors {
            assert!(
                err.is_permanent(),
                "Expected {} to be permanent",
                err.error_code()
            );
            assert!(
                !err.is_transient(),
                "Expected {} to not be transient",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ConnectorError::AuthenticationFailed.error_code(),
            "AUTH_FAILED"
        );
        assert_eq!(
            ConnectorError::RateLimited {
                retry_after_secs: None
            }
            .error_code(),
            "RATE_LIMITED"
        );
        assert_eq!(
            ConnectorError::connection_failed("test").error_code(),
            "CONNECTION_FAILED"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::ConnectionTimeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "connection timeout after 30 seconds");

        let err = ConnectorError::RateLimited {
            retry_after_secs: Some(12),
        };
        assert_eq!(err.to_string(), "rate limited by storefront, retry after 12s");

        let err = ConnectorError::ServerError {
            status: 503,
            body: None,
        };
        assert_eq!(err.to_string(), "storefront server error: HTTP 503");
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::new(std::io::ErrorKind::Other, "underlying error");
        let err = ConnectorError::connection_failed_with_source("failed", source_err);

        assert!(err.is_transient());
        if let ConnectorError::ConnectionFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected ConnectionFailed variant");
        }
    }
}
