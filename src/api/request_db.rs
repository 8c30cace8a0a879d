use crate::api::rest::AppState;
use crate::db::repositories::detections::DetectionsRepository;
use crate::error::Error;
use anyhow::Result;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use log::debug;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::convert::Infallible;
use std::sync::Arc;

/// Request-scoped database handle.
///
/// A connection is checked out of the pool the first time a handler asks for one
/// and reused for the rest of the request. Dropping the handle, which axum does once
/// the handler returns or fails, hands the connection back.
pub struct RequestDb {
    pool: Arc<SqlitePool>,
    conn: Option<PoolConnection<Sqlite>>,
}

impl RequestDb {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool, conn: None }
    }

    /// Connection for this request, acquired on first use
    pub async fn conn(&mut self) -> Result<&mut SqliteConnection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                debug!("Acquiring request connection");
                self.pool.acquire().await.map_err(|e| {
                    Error::Database(format!("Failed to acquire connection: {}", e))
                })?
            }
        };

        Ok(&mut **self.conn.insert(conn))
    }

    pub async fn detections(&mut self) -> Result<DetectionsRepository<'_>> {
        Ok(DetectionsRepository::new(self.conn().await?))
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

impl Drop for RequestDb {
    fn drop(&mut self) {
        if self.conn.take().is_some() {
            debug!("Released request connection");
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestDb {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(RequestDb::new(Arc::clone(&state.db_pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_pool, migrations};

    #[tokio::test]
    async fn test_connection_is_lazy_and_reused() -> Result<()> {
        let pool = Arc::new(memory_pool().await?);
        migrations::run_migrations(&pool).await?;

        let mut db = RequestDb::new(Arc::clone(&pool));
        assert!(!db.is_connected());

        db.detections().await?.count().await?;
        assert!(db.is_connected());

        // The pool holds a single connection, so a second checkout would block
        let count = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            async { db.detections().await?.count().await },
        )
        .await??;
        assert_eq!(count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_drop_returns_connection_to_pool() -> Result<()> {
        let pool = Arc::new(memory_pool().await?);
        migrations::run_migrations(&pool).await?;

        {
            let mut db = RequestDb::new(Arc::clone(&pool));
            db.conn().await?;
        }

        // The only connection must be available again for the next request
        let mut next = RequestDb::new(Arc::clone(&pool));
        let count = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            async { next.detections().await?.count().await },
        )
        .await??;
        assert_eq!(count, 0);

        Ok(())
    }
}
