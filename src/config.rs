//! Configuration loading.
//!
//! Settings are layered with the following precedence (highest to lowest):
//! 1. CLI flags (applied by `main`)
//! 2. Environment variables prefixed with `GPS_SYNC_`, `__` between sections,
//!    e.g. `GPS_SYNC_INGEST__API_KEY`
//! 3. Config file (`gps-sync.toml` in the working directory, or `--config`)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [garmin]
//! access_token = "..."       # or GPS_SYNC_GARMIN__ACCESS_TOKEN
//! domain = "garmin.cn"       # defaults to garmin.com
//!
//! [ingest]
//! base_url = "https://ingest.example.com"
//! api_key = "..."            # or GPS_SYNC_INGEST__API_KEY
//!
//! [sync]
//! page_size = 100
//! max_attempts = 3
//! retry_delay_secs = 5
//! retry_strategy = "fixed"   # or "exponential"
//!
//! [state]
//! dir = "/var/lib/gps-sync"
//! ```

use crate::sync::OrchestratorConfig;
use crate::sync::downloader::{RetryConfig, RetryStrategy};

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "gps-sync.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to load configuration: {0}")]
	Load(#[from] config::ConfigError),
}

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Settings {
	pub garmin: GarminSettings,
	pub ingest: IngestSettings,
	#[serde(default)]
	pub sync: SyncSettings,
	#[serde(default)]
	pub state: StateSettings,
}

/// Upstream session settings.
#[derive(Deserialize)]
pub struct GarminSettings {
	pub access_token: String,
	#[serde(default = "default_domain")]
	pub domain: String,
}

/// Downstream endpoint settings.
#[derive(Deserialize)]
pub struct IngestSettings {
	pub base_url: String,
	pub api_key: String,
}

/// Sync loop tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
	pub page_size: u32,
	pub max_attempts: u32,
	pub retry_delay_secs: u64,
	pub retry_strategy: RetryStrategy,
	pub request_timeout_secs: u64,
}

/// Where the watermark and failure ledger live.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateSettings {
	pub dir: PathBuf,
}

fn default_domain() -> String {
	"garmin.com".to_string()
}

impl Default for SyncSettings {
	fn default() -> Self {
		Self {
			page_size: 100,
			max_attempts: 3,
			retry_delay_secs: 5,
			retry_strategy: RetryStrategy::Fixed,
			request_timeout_secs: 30,
		}
	}
}

impl Default for StateSettings {
	fn default() -> Self {
		Self {
			dir: PathBuf::from("."),
		}
	}
}

impl fmt::Debug for GarminSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GarminSettings")
			.field("access_token", &"<redacted>")
			.field("domain", &self.domain)
			.finish()
	}
}

impl fmt::Debug for IngestSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IngestSettings")
			.field("base_url", &self.base_url)
			.field("api_key", &"<redacted>")
			.finish()
	}
}

impl Settings {
	/// Load settings from `path` (required when given) or the default file, then the environment.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let file = match path {
			Some(path) => File::from(path).format(FileFormat::Toml).required(true),
			None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
		};

		let settings = ConfigBuilder::builder()
			.add_source(file)
			.add_source(
				Environment::with_prefix("GPS_SYNC")
					.prefix_separator("_")
					.separator("__")
					.try_parsing(true),
			)
			.build()?;

		Ok(settings.try_deserialize()?)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.sync.request_timeout_secs)
	}

	pub fn orchestrator_config(&self) -> OrchestratorConfig {
		OrchestratorConfig {
			page_size: self.sync.page_size,
			retry: RetryConfig {
				max_attempts: self.sync.max_attempts,
				delay: Duration::from_secs(self.sync.retry_delay_secs),
				strategy: self.sync.retry_strategy,
			},
		}
	}
}
