//!
//! HTTP client for the Garmin Connect API with bearer-token sessions.
//!
//! This module provides the `ActivitySource` seam used by the sync engine and its
//! reqwest-backed implementation. The client is stateless apart from its token:
//! listing, GPX export and the session check are plain authenticated GETs.

use super::types::*;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote service that lists activities and exports their GPS tracks.
#[async_trait::async_trait]
pub trait ActivitySource: Send + Sync {
	/// Check that the session is accepted before any sync work begins.
	async fn authenticate(&self) -> Result<(), SourceError>;

	/// List one page of activities, newest first as the platform returns them.
	async fn list_activities(
		&self,
		offset: u32,
		limit: u32,
	) -> Result<Vec<ActivityMeta>, SourceError>;

	/// Download the raw GPX document for one activity.
	async fn download_track(&self, activity_id: u64) -> Result<Vec<u8>, SourceError>;
}

/// Garmin Connect API client
#[derive(Clone)]
pub struct GarminConnectClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// API root, e.g. `https://connectapi.garmin.com`.
	api_base: String,
	/// OAuth bearer token for the session.
	access_token: String,
}

impl GarminConnectClient {
	/// Create a client for the given Garmin domain (`garmin.com` or `garmin.cn`).
	///
	/// # Arguments
	/// * `domain` - Garmin Connect domain; the API host is `connectapi.<domain>`.
	/// * `access_token` - OAuth bearer token.
	/// * `timeout` - Per-request timeout.
	pub fn new(domain: &str, access_token: String, timeout: Duration) -> Result<Self, SourceError> {
		Self::with_api_base(format!("https://connectapi.{}", domain), access_token, timeout)
	}

	/// Create a client against an explicit API root.
	pub fn with_api_base(
		api_base: String,
		access_token: String,
		timeout: Duration,
	) -> Result<Self, SourceError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			api_base: api_base.trim_end_matches('/').to_string(),
			access_token,
		})
	}

	async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, SourceError> {
		let url = format!("{}{}", self.api_base, path);
		debug!("GET {}", url);

		let response = self
			.http_client
			.get(&url)
			.bearer_auth(&self.access_token)
			.query(query)
			.send()
			.await?;

		let status = response.status();
		if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
			return Err(SourceError::Authentication(format!(
				"{} returned {}",
				path, status
			)));
		}
		if !status.is_success() {
			return Err(SourceError::Status {
				status: status.as_u16(),
				url,
			});
		}

		Ok(response)
	}
}

#[async_trait::async_trait]
impl ActivitySource for GarminConnectClient {
	async fn authenticate(&self) -> Result<(), SourceError> {
		self.get("/userprofile-service/socialProfile", &[]).await?;
		info!("Garmin Connect session accepted");
		Ok(())
	}

	async fn list_activities(
		&self,
		offset: u32,
		limit: u32,
	) -> Result<Vec<ActivityMeta>, SourceError> {
		let response = self
			.get(
				"/activitylist-service/activities/search/activities",
				&[("start", offset.to_string()), ("limit", limit.to_string())],
			)
			.await?;

		let raw: Vec<RawActivity> = serde_json::from_slice(&response.bytes().await?)?;
		let total = raw.len();

		let activities: Vec<ActivityMeta> =
			raw.into_iter().filter_map(RawActivity::into_meta).collect();
		if activities.len() < total {
			warn!(
				"Dropped {} listing records without an activity id at offset {}",
				total - activities.len(),
				offset
			);
		}

		debug!("Listed {} activities at offset {}", activities.len(), offset);
		Ok(activities)
	}

	async fn download_track(&self, activity_id: u64) -> Result<Vec<u8>, SourceError> {
		let response = self
			.get(
				&format!("/download-service/export/gpx/activity/{}", activity_id),
				&[],
			)
			.await?;

		Ok(response.bytes().await?.to_vec())
	}
}
