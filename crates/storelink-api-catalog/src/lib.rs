//! # storelink-api-catalog
//!
//! The action-dispatch surface of the catalog synchronization engine:
//! axum handlers, request/response DTOs with the uniform `ok` envelope,
//! and the composition root that wires the engine services to the
//! WooCommerce connector.

pub mod error;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod router;

pub use error::{CatalogApiError, Result};
pub use models::TenantContext;
pub use provider::WooStoreProvider;
pub use router::{catalog_routes, CatalogApiState};
