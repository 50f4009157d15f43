//! PostgreSQL persistence for account scores.
//!
//! Only scores are persisted; sessions live and die in memory.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;

pub mod accounts;
pub mod config;
pub mod timeouts;

pub use accounts::PgAccountService;
pub use config::DatabaseConfig;

/// Shared connection pool
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Open a pool sized and timed by `config`
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Connected pool, or the connect error
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Account database pool open ({}-{} connections)",
            config.min_connections,
            config.max_connections
        );
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Account score store sharing this pool
    pub fn account_store(&self) -> PgAccountService {
        PgAccountService::new(Arc::clone(&self.pool))
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
