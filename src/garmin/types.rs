//! Types for the Garmin Connect activity listing and session handling

use serde::Deserialize;

/// Identifies one recorded session as listed by the upstream platform.
///
/// Built from [`RawActivity`] at the client boundary, so missing optional fields
/// are already replaced with defaults by the time the sync engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityMeta {
    /// Upstream activity identifier.
    pub id: u64,
    /// Display name given by the athlete or the device.
    pub name: String,
    /// Explicit indoor flag reported by the platform.
    pub is_indoor: bool,
    /// Activity type key, e.g. `running` or `treadmill_running`.
    pub activity_type_key: String,
}

/// Activity record as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawActivity {
    #[serde(rename = "activityId")]
    pub activity_id: Option<u64>,
    #[serde(rename = "activityName", default)]
    pub activity_name: Option<String>,
    #[serde(rename = "activityType", default)]
    pub activity_type: Option<RawActivityType>,
    #[serde(rename = "isIndoor", alias = "indoor", default)]
    pub is_indoor: Option<bool>,
}

/// Nested activity type object of a listing record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawActivityType {
    #[serde(rename = "typeKey", default)]
    pub type_key: Option<String>,
}

impl RawActivity {
    /// Convert into an [`ActivityMeta`], or `None` when the record carries no id.
    pub fn into_meta(self) -> Option<ActivityMeta> {
        let id = self.activity_id?;
        Some(ActivityMeta {
            id,
            name: self.activity_name.unwrap_or_default(),
            is_indoor: self.is_indoor.unwrap_or(false),
            activity_type_key: self
                .activity_type
                .and_then(|t| t.type_key)
                .unwrap_or_default(),
        })
    }
}

/// Error types for upstream listing, download and session checks
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Authentication rejected: {0}")]
    Authentication(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_meta_reads_nested_type_key() {
        let raw: RawActivity = serde_json::from_str(
            r#"{
                "activityId": 18234,
                "activityName": "Morning Run",
                "activityType": {"typeKey": "running", "typeId": 1},
                "distance": 5012.3
            }"#,
        )
        .unwrap();

        let meta = raw.into_meta().unwrap();
        assert_eq!(meta.id, 18234);
        assert_eq!(meta.name, "Morning Run");
        assert_eq!(meta.activity_type_key, "running");
        assert!(!meta.is_indoor);
    }

    #[test]
    fn test_into_meta_defaults_missing_fields() {
        let raw: RawActivity =
            serde_json::from_str(r#"{"activityId": 7, "activityName": null, "indoor": true}"#)
                .unwrap();

        let meta = raw.into_meta().unwrap();
        assert_eq!(meta.name, "");
        assert_eq!(meta.activity_type_key, "");
        assert!(meta.is_indoor);
    }

    #[test]
    fn test_into_meta_drops_record_without_id() {
        let raw: RawActivity = serde_json::from_str(r#"{"activityName": "Ghost"}"#).unwrap();
        assert!(raw.into_meta().is_none());
    }
}
