//! # WooCommerce Connector
//!
//! Implements the storelink connector traits against the WooCommerce REST
//! API (`wp-json/wc/v3`). Handles authentication modes, price/stock wire
//! normalization, HTTP status classification into the transient/permanent
//! error taxonomy, and outbound rate limiting.

pub mod config;
pub mod connector;
pub mod rate_limit;
pub mod wire;

pub use config::{WooAuthMode, WooConfig};
pub use connector::WooConnector;
pub use rate_limit::{RateLimitConfig, RateLimiter};
