use crate::config::DatabaseConfig;
use crate::error::Error;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub mod migrations;
pub mod models;
pub mod repositories;

/// Database service for handling connections and migrations
pub struct DatabaseService {
    pub pool: Arc<SqlitePool>,
}

impl DatabaseService {
    /// Open (creating if missing) the database file and bring the schema up
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Initializing Database service at {}", config.path.display());

        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        info!("Connected to SQLite database");

        let service = Self {
            pool: Arc::new(pool),
        };
        service.run_migrations().await?;

        Ok(service)
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        migrations::run_migrations(&self.pool).await?;

        info!("Database migrations completed successfully");

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Run a trivial query against the pool
pub async fn health_check(pool: &SqlitePool) -> Result<bool> {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Ok(true),
        Err(e) => {
            error!("Database health check failed: {}", e);
            Ok(false)
        }
    }
}

/// Single-connection in-memory pool; every checkout sees the same database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> Result<SqlitePool> {
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_creates_file_and_schema() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("pothole-db-{}", std::process::id()));
        let config = DatabaseConfig {
            path: dir.join("nested").join("database.db"),
            ..DatabaseConfig::default()
        };

        let service = DatabaseService::new(&config).await?;
        assert!(config.path.exists());
        assert!(health_check(&service.pool).await?);

        // Opening again over the existing file re-runs the schema step cleanly
        service.close().await;
        let service = DatabaseService::new(&config).await?;
        assert!(health_check(&service.pool).await?);
        service.close().await;

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn test_health_check_fails_on_closed_pool() -> Result<()> {
        let pool = memory_pool().await?;
        assert!(health_check(&pool).await?);

        pool.close().await;
        assert!(!health_check(&pool).await?);

        Ok(())
    }
}
