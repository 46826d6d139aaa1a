//! PostgreSQL connection pool
//!
//! Pool sizes and timeouts come from `[database]` in the application config.

use std::time::Duration;

use pm_core::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool and establish `min_connections` up front
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = Self::options(config).connect(&config.url).await?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "database pool created"
        );

        Ok(Self { pool })
    }

    /// Create a pool that opens connections on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = Self::options(config).connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    fn options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round trip to the server
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let mut config = DatabaseConfig::with_url("postgres://pm:pm@localhost:1/pm");
        config.min_connections = 0;
        let db = Database::connect_lazy(&config).unwrap();
        assert_eq!(db.stats().size, 0);
    }
}
