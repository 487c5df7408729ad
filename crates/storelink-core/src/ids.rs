//! Strongly Typed Identifiers
//!
//! Newtype wrappers around UUIDs for the entities storelink deals with.
//! Using distinct types prevents accidentally passing, say, a run id where
//! a listing id is expected.
//!
//! # Example
//!
//! ```
//! use storelink_core::{StoreId, TenantId};
//!
//! let tenant = TenantId::new();
//! let store = StoreId::new();
//!
//! fn requires_tenant(id: TenantId) -> String {
//!     id.to_string()
//! }
//!
//! let _ = requires_tenant(tenant);
//! // requires_tenant(store); // does not compile
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The underlying UUID parse error message.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the underlying UUID by value.
            #[must_use]
            pub fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Strongly typed identifier for tenants.
    ///
    /// Every durable row and every query in storelink is scoped by tenant.
    TenantId
);

define_id!(
    /// Strongly typed identifier for storefront stores.
    ///
    /// One tenant may connect any number of stores; listings, runs and
    /// sync logs are all scoped to a single store.
    StoreId
);

define_id!(
    /// Strongly typed identifier for internal catalog products.
    ProductId
);

define_id!(
    /// Strongly typed identifier for catalog listings (the durable link
    /// between an internal product and its remote counterpart).
    ListingId
);

define_id!(
    /// Strongly typed identifier for synchronization runs.
    RunId
);

define_id!(
    /// Strongly typed identifier for the per-product items within a run.
    RunItemId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_valid_id() {
        let id = RunId::new();
        let id_str = id.to_string();
        // UUID format: 8-4-4-4-12 hex digits
        assert_eq!(id_str.len(), 36);
        assert!(id_str.contains('-'));
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = ListingId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn test_display_returns_uuid_string() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let id = StoreId::from_uuid(uuid);
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_parse_valid_uuid() {
        let id: TenantId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_parse_invalid_uuid_returns_error() {
        let result: std::result::Result<TenantId, _> = "not-a-uuid".parse();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "TenantId");
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_error_display_names_the_type() {
        let result: std::result::Result<RunItemId, _> = "invalid".parse();
        let err = result.unwrap_err();
        let display = err.to_string();
        assert!(display.contains("RunItemId"));
        assert!(display.contains("Failed to parse"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let id = ProductId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = RunId::new();
        let json = serde_json::to_string(&original).unwrap();
        let deserialized: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_can_use_as_hashmap_key() {
        use std::collections::HashMap;

        let mut map: HashMap<ProductId, String> = HashMap::new();
        let id1 = ProductId::new();
        let id2 = ProductId::new();

        map.insert(id1, "first".to_string());
        map.insert(id2, "second".to_string());

        assert_eq!(map.get(&id1), Some(&"first".to_string()));
        assert_eq!(map.get(&id2), Some(&"second".to_string()));
    }

    #[test]
    fn test_uuid_conversions() {
        let uuid = Uuid::new_v4();
        let id = TenantId::from(uuid);
        let back: Uuid = id.into();
        assert_eq!(uuid, back);
    }
}
