use crate::garmin::SourceError;

use serde::{Deserialize, Serialize};

/// One timestamped position taken from a GPX trackpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	/// Seconds since the Unix epoch, UTC.
	pub timestamp: i64,
	pub latitude: f64,
	pub longitude: f64,
	/// Elevation in metres, `0.0` when the trackpoint has none.
	#[serde(default)]
	pub altitude: f64,
}

/// Errors raised while loading or writing the watermark and failure ledger
#[derive(Debug, thiserror::Error)]
pub enum StateError {
	#[error("IO error on {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Corrupt state file {path}: {source}")]
	Json {
		path: String,
		#[source]
		source: serde_json::Error,
	},
}

/// Run-level errors; only these abort a sync pass
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Authentication failed: {0}")]
	Authentication(SourceError),

	#[error("Activity listing failed at offset {offset}: {source}")]
	Listing {
		offset: u32,
		#[source]
		source: SourceError,
	},

	#[error("State error: {0}")]
	State(#[from] StateError),
}
