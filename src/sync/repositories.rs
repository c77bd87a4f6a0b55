use crate::sync::types::StateError;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const WATERMARK_FILENAME: &str = "sync_state.json";
const FAILURE_LEDGER_FILENAME: &str = "failed_activities.txt";

/// Repository for the durable watermark
#[async_trait::async_trait]
pub trait WatermarkRepository: Send + Sync {
	async fn save(&self, last_uploaded_timestamp: i64) -> Result<(), StateError>;
	async fn load(&self) -> Result<Option<i64>, StateError>;
}

/// Repository for the end-of-run list of failed activities
#[async_trait::async_trait]
pub trait FailureLedgerRepository: Send + Sync {
	async fn save(&self, activity_ids: &[u64]) -> Result<(), StateError>;
}

/// On-disk shape of `sync_state.json`.
#[derive(Debug, Serialize, Deserialize)]
struct WatermarkRecord {
	last_uploaded_timestamp: i64,
	#[serde(default)]
	updated_at: Option<String>,
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
	StateError::Io {
		path: path.display().to_string(),
		source,
	}
}

/// Write `content` next to `path` and rename it into place.
async fn write_atomically(path: &Path, content: &[u8]) -> Result<(), StateError> {
	let tmp = path.with_extension("tmp");
	tokio::fs::write(&tmp, content)
		.await
		.map_err(|e| io_error(&tmp, e))?;
	tokio::fs::rename(&tmp, path)
		.await
		.map_err(|e| io_error(path, e))
}

/// File-based implementation of WatermarkRepository
pub struct FileWatermarkRepository {
	data_dir: PathBuf,
}

impl FileWatermarkRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_state_filename(&self) -> PathBuf {
		self.data_dir.join(WATERMARK_FILENAME)
	}
}

#[async_trait::async_trait]
impl WatermarkRepository for FileWatermarkRepository {
	async fn save(&self, last_uploaded_timestamp: i64) -> Result<(), StateError> {
		let record = WatermarkRecord {
			last_uploaded_timestamp,
			updated_at: Some(chrono::Utc::now().to_rfc3339()),
		};
		let filename = self.get_state_filename();

		let content = serde_json::to_vec_pretty(&record).map_err(|e| StateError::Json {
			path: filename.display().to_string(),
			source: e,
		})?;
		write_atomically(&filename, &content).await?;

		debug!(
			"Saved watermark {} to {:?}",
			last_uploaded_timestamp, filename
		);
		Ok(())
	}

	async fn load(&self) -> Result<Option<i64>, StateError> {
		let filename = self.get_state_filename();

		let content = match tokio::fs::read(&filename).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(io_error(&filename, e)),
		};

		let record: WatermarkRecord =
			serde_json::from_slice(&content).map_err(|e| StateError::Json {
				path: filename.display().to_string(),
				source: e,
			})?;

		info!(
			"Loaded watermark {} from {:?}",
			record.last_uploaded_timestamp, filename
		);
		Ok(Some(record.last_uploaded_timestamp))
	}
}

/// File-based implementation of FailureLedgerRepository, one id per line
pub struct FileFailureLedgerRepository {
	data_dir: PathBuf,
}

impl FileFailureLedgerRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	pub fn get_ledger_filename(&self) -> PathBuf {
		self.data_dir.join(FAILURE_LEDGER_FILENAME)
	}
}

#[async_trait::async_trait]
impl FailureLedgerRepository for FileFailureLedgerRepository {
	async fn save(&self, activity_ids: &[u64]) -> Result<(), StateError> {
		let filename = self.get_ledger_filename();
		let content: String = activity_ids
			.iter()
			.map(|id| format!("{}\n", id))
			.collect();

		tokio::fs::write(&filename, content)
			.await
			.map_err(|e| io_error(&filename, e))?;

		info!(
			"Failure ledger saved: {} activities written to {:?}",
			activity_ids.len(),
			filename
		);
		Ok(())
	}
}
