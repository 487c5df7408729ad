//! # Storefront Connector Framework
//!
//! Capability-based trait definitions for storefront platform adapters,
//! plus the wire types and error taxonomy shared by all implementations.
//!
//! A connector wraps one external storefront (e.g. a WooCommerce site) and
//! exposes the narrow catalog surface the sync engine needs: search
//! products by SKU, read products, and write product fields. Errors carry
//! an explicit transient/permanent classification that drives the retry
//! behavior of the execution worker.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConnectorError, ConnectorResult};
pub use traits::{Connector, ProductSearch, ProductWrite, StorefrontApi};
pub use types::{NewRemoteProduct, RemoteProduct, RemoteProductPatch, RemoteProductType};
