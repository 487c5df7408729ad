//! # storelink-core
//!
//! Shared building blocks for the storelink workspace: strongly typed
//! identifiers and the common error type used across crates.

pub mod error;
pub mod ids;

pub use error::{CoreError, Result};
pub use ids::{ListingId, ParseIdError, ProductId, RunId, RunItemId, StoreId, TenantId};
