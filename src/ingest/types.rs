//! Wire types for the GPS batch ingestion endpoint

use crate::sync::GeoPoint;

use serde::Serialize;

/// Request body of `POST /api/v1/gps/batch`.
#[derive(Debug, Clone, Serialize)]
pub struct GpsBatch {
    pub gps_data: Vec<GpsRecord>,
}

/// One trackpoint as the ingestion endpoint expects it.
///
/// The endpoint takes the epoch timestamp as a string.
#[derive(Debug, Clone, Serialize)]
pub struct GpsRecord {
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl From<&GeoPoint> for GpsRecord {
    fn from(point: &GeoPoint) -> Self {
        Self {
            timestamp: point.timestamp.to_string(),
            latitude: point.latitude,
            longitude: point.longitude,
            altitude: point.altitude,
        }
    }
}

impl GpsBatch {
    pub fn new(points: &[GeoPoint]) -> Self {
        Self {
            gps_data: points.iter().map(GpsRecord::from).collect(),
        }
    }
}

/// Error types for batch uploads
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ingestion endpoint rejected batch with status {0}")]
    Status(u16),

    #[error("Invalid ingestion URL: {0}")]
    InvalidUrl(String),
}
