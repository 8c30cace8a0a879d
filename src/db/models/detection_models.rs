use serde::Serialize;

/// A stored detection row
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Detection {
    pub id: i64,
    pub timestamp: String,
    pub detected: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Values for a detection that has not been written yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewDetection {
    pub timestamp: String,
    pub detected: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The subset of a detection served for charting
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DetectionPoint {
    pub timestamp: String,
    pub detected: i64,
}
