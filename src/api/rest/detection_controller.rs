use crate::api::request_db::RequestDb;
use crate::api::rest::{ApiResult, AppState};
use crate::db;
use crate::db::models::detection_models::{DetectionPoint, NewDetection};
use crate::db::repositories::detections::RECENT_LIMIT;
use crate::error::Error;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_TEXT: &str = "Pothole Detector Backend. API endpoints: /api/report_detection (POST), /api/get_results (GET)";

/// `detected` may be sent as a flag or as a count
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum DetectedValue {
    Flag(bool),
    Count(i64),
}

impl From<DetectedValue> for i64 {
    fn from(value: DetectedValue) -> Self {
        match value {
            DetectedValue::Flag(flag) => flag as i64,
            DetectedValue::Count(count) => count,
        }
    }
}

/// Request body for reporting a detection
#[derive(Debug, Deserialize)]
pub struct ReportDetectionRequest {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub detected: Option<DetectedValue>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ReportDetectionRequest {
    /// Check the request and fill in defaults
    pub fn into_new_detection(self) -> Result<NewDetection, Error> {
        let timestamp = match self.timestamp {
            Some(value) if !is_falsy(&value) => match value {
                Value::String(timestamp) => timestamp,
                _ => {
                    return Err(Error::InvalidField(
                        "Timestamp must be a string".to_string(),
                    ))
                }
            },
            _ => return Err(Error::Validation("Timestamp is required".to_string())),
        };

        Ok(NewDetection {
            timestamp,
            detected: self.detected.map(i64::from).unwrap_or(0),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// JSON values that count as "not provided" for a required field
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}

pub async fn index() -> &'static str {
    STATUS_TEXT
}

/// Record one detection
pub async fn report_detection(
    mut db: RequestDb,
    payload: Result<Json<ReportDetectionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = payload?;
    let detection = request.into_new_detection()?;

    let id = db.detections().await?.create(&detection).await?;

    info!(
        "Reported detection: {}, Detected: {}",
        detection.timestamp, detection.detected
    );
    debug!("Detection stored with id {}", id);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Detection reported successfully".to_string(),
        }),
    ))
}

/// The most recent detections in chronological order
pub async fn get_results(mut db: RequestDb) -> ApiResult<Json<Vec<DetectionPoint>>> {
    let results = db.detections().await?.get_recent(RECENT_LIMIT).await?;
    Ok(Json(results))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // health_check only errors on internal failures; treat those as unhealthy too
    let healthy = db::health_check(&state.db_pool).await.unwrap_or(false);

    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            database: healthy,
        }),
    )
}
