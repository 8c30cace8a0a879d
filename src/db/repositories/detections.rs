#[cfg(test)]
use crate::db::models::detection_models::Detection;
use crate::db::models::detection_models::{DetectionPoint, NewDetection};
use crate::error::Error;
use anyhow::Result;
use sqlx::SqliteConnection;

/// Number of rows served to the chart
pub const RECENT_LIMIT: i64 = 100;

/// Detections repository bound to a single connection for the lifetime of a request
pub struct DetectionsRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> DetectionsRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a detection and return its assigned id
    pub async fn create(&mut self, detection: &NewDetection) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO detections (timestamp, detected, latitude, longitude)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&detection.timestamp)
        .bind(detection.detected)
        .bind(detection.latitude)
        .bind(detection.longitude)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to create detection: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// Get detection by ID
    #[cfg(test)]
    pub async fn get_by_id(&mut self, id: i64) -> Result<Option<Detection>> {
        let result = sqlx::query_as::<_, Detection>(
            r#"
            SELECT id, timestamp, detected, latitude, longitude
            FROM detections
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to get detection by ID: {}", e)))?;

        Ok(result)
    }

    /// The latest `limit` detections, oldest first.
    ///
    /// The limit is applied to the newest rows, so the query sorts descending and the
    /// page is flipped afterwards. Sorting ascending in SQL would bound to the oldest rows.
    pub async fn get_recent(&mut self, limit: i64) -> Result<Vec<DetectionPoint>> {
        let mut result = sqlx::query_as::<_, DetectionPoint>(
            r#"
            SELECT timestamp, detected
            FROM detections
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to get recent detections: {}", e)))?;

        result.reverse();

        Ok(result)
    }

    #[cfg(test)]
    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM detections")
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| Error::Database(format!("Failed to count detections: {}", e)))?;

        Ok(count)
    }
}
