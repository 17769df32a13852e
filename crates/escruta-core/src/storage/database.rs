//! PostgreSQL database operations
//!
//! Provides connection pool management and database initialization for escruta.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseSettings;
use crate::storage::migrations;

/// Default maximum connections in the pool
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a free connection
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Whether to run migrations automatically
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    /// Create a new database config for the given URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            auto_migrate: true,
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Disable automatic migrations
    pub fn no_migrate(mut self) -> Self {
        self.auto_migrate = false;
        self
    }
}

impl From<&DatabaseSettings> for DatabaseConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            url: settings.url.clone(),
            max_connections: settings.max_connections,
            acquire_timeout: Duration::from_secs(settings.acquire_timeout_secs),
            auto_migrate: settings.auto_migrate,
        }
    }
}

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with the given configuration, running migrations when enabled
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };

        if config.auto_migrate {
            db.migrate().await?;
        }

        Ok(db)
    }

    /// Create a pool that only connects on first use
    ///
    /// Used where a handle is needed before the server is reachable, e.g. router tests.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy(&config.url)
            .context("Invalid database URL")?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    /// Check migration status
    pub async fn migration_status(&self) -> Result<migrations::MigrationStatus> {
        migrations::migration_status(&self.pool)
            .await
            .context("Failed to check migration status")
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::with_url("postgres://localhost/test")
            .max_connections(2)
            .no_migrate();

        assert_eq!(config.url, "postgres://localhost/test");
        assert_eq!(config.max_connections, 2);
        assert!(!config.auto_migrate);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = DatabaseSettings {
            url: "postgres://db/escruta".to_string(),
            max_connections: 4,
            acquire_timeout_secs: 3,
            auto_migrate: false,
        };

        let config = DatabaseConfig::from(&settings);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(3));
        assert!(!config.auto_migrate);
    }

    #[tokio::test]
    async fn test_connect_lazy_does_not_touch_server() {
        let config = DatabaseConfig::with_url("postgres://nobody@127.0.0.1:1/none");
        let db = Database::connect_lazy(&config).unwrap();
        assert_eq!(db.pool().size(), 0);
    }

    #[tokio::test]
    async fn test_connect_lazy_rejects_garbage_url() {
        let config = DatabaseConfig::with_url("not a url");
        assert!(Database::connect_lazy(&config).is_err());
    }
}
