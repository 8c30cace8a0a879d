use anyhow::Result;
use sqlx::{Executor, SqlitePool};
use tracing::info;

use crate::error::Error;

/// Schema scripts in the order they are applied. Every script must be
/// idempotent, they run on each startup.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_create_detections.sql",
    include_str!("sql/001_create_detections.sql"),
)];

/// Ensure the schema exists. Safe to call any number of times.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        execute_migration(pool, name, sql).await?;
        info!("Applied migration: {}", name);
    }

    Ok(())
}

async fn execute_migration(pool: &SqlitePool, name: &str, sql: &str) -> Result<()> {
    pool.execute(sql)
        .await
        .map_err(|e| Error::Database(format!("Migration {} failed: {}", name, e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_migrations_are_idempotent() -> Result<()> {
        let pool = memory_pool().await?;

        run_migrations(&pool).await?;
        run_migrations(&pool).await?;

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'detections'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(tables, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_keeps_existing_rows() -> Result<()> {
        let pool = memory_pool().await?;
        run_migrations(&pool).await?;

        sqlx::query("INSERT INTO detections (timestamp, detected) VALUES ('t1', 1)")
            .execute(&pool)
            .await?;
        run_migrations(&pool).await?;

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM detections")
            .fetch_one(&pool)
            .await?;
        assert_eq!(rows, 1);

        Ok(())
    }
}
