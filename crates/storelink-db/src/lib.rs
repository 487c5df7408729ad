//! # storelink-db
//!
//! Postgres persistence for storelink: connection pool helpers, embedded
//! migrations, and the models for stores, products, listings, runs, run
//! items and the sync log.
//!
//! Models follow the "methods on the row type" convention: constructors
//! and finders are async functions on the model struct taking a pool or
//! transaction, and every query is tenant-scoped.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
