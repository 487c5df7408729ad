//! Database connection pool.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::error::DbError;

/// Thin wrapper around the Postgres pool with storelink defaults.
#[derive(Debug, Clone)]
pub struct DbPool {
    inner: PgPool,
}

impl DbPool {
    /// Connect to the database with default pool settings.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let inner = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;
        Ok(Self { inner })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(inner: PgPool) -> Self {
        Self { inner }
    }

    /// Access the underlying sqlx pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.inner
    }
}
