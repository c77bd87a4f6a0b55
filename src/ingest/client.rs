//!
//! HTTP client for the downstream GPS ingestion endpoint.
//!
//! A batch is one POST carrying every new point of an activity. Any transport
//! error or non-2xx status is reported back as a failure; the client never
//! retries on its own, the persisted watermark makes the next run try again.

use super::types::*;
use crate::sync::GeoPoint;

use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, info};

/// Path of the batch endpoint below the configured base URL.
const GPS_BATCH_PATH: &str = "/api/v1/gps/batch";

/// Destination for batches of new trackpoints.
#[async_trait::async_trait]
pub trait BatchUploader: Send + Sync {
	/// Post all `points` in a single request. `Ok` means the endpoint accepted them.
	async fn post_batch(&self, points: &[GeoPoint]) -> Result<(), IngestError>;
}

/// Ingestion endpoint client
#[derive(Clone)]
pub struct IngestClient {
	http_client: Client,
	/// Fully resolved batch URL, without the api key.
	batch_url: Url,
	api_key: String,
}

impl IngestClient {
	/// Create a client for `base_url`.
	///
	/// # Arguments
	/// * `base_url` - Root of the ingestion service; a trailing `/` is tolerated.
	/// * `api_key` - Key sent as the `api_key` query parameter.
	/// * `timeout` - Per-request timeout.
	pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, IngestError> {
		let raw = format!("{}{}", base_url.trim_end_matches('/'), GPS_BATCH_PATH);
		let batch_url = Url::parse(&raw).map_err(|e| IngestError::InvalidUrl(format!("{}: {}", raw, e)))?;
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			batch_url,
			api_key,
		})
	}
}

#[async_trait::async_trait]
impl BatchUploader for IngestClient {
	async fn post_batch(&self, points: &[GeoPoint]) -> Result<(), IngestError> {
		debug!("Posting {} points to {}", points.len(), self.batch_url);

		let response = self
			.http_client
			.post(self.batch_url.clone())
			.query(&[("api_key", self.api_key.as_str())])
			.json(&GpsBatch::new(points))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(IngestError::Status(status.as_u16()));
		}

		info!("Ingestion endpoint accepted {} points", points.len());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::serve_once;

	fn points() -> Vec<GeoPoint> {
		vec![
			GeoPoint {
				timestamp: 200,
				latitude: 1.5,
				longitude: 2.5,
				altitude: 10.0,
			},
			GeoPoint {
				timestamp: 300,
				latitude: 1.6,
				longitude: 2.6,
				altitude: 0.0,
			},
		]
	}

	#[tokio::test]
	async fn test_post_batch_sends_key_as_query_and_points_as_json() {
		let (base, request) = serve_once("201 Created", "{}").await;
		let client =
			IngestClient::new(&format!("{}/", base), "secret".to_string(), Duration::from_secs(5))
				.unwrap();

		client.post_batch(&points()).await.unwrap();

		let request = request.await.unwrap();
		assert!(request.starts_with("POST /api/v1/gps/batch?api_key=secret "));
		let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
		let json: serde_json::Value = serde_json::from_str(body).unwrap();
		assert_eq!(json["gps_data"].as_array().unwrap().len(), 2);
		assert_eq!(json["gps_data"][1]["timestamp"], "300");
	}

	#[tokio::test]
	async fn test_post_batch_reports_rejection() {
		let (base, _request) = serve_once("500 Internal Server Error", "oops").await;
		let client = IngestClient::new(&base, "secret".to_string(), Duration::from_secs(5)).unwrap();

		let err = client.post_batch(&points()).await.unwrap_err();
		assert!(matches!(err, IngestError::Status(500)));
	}

	#[test]
	fn test_new_rejects_invalid_base_url() {
		let result = IngestClient::new("not a url", "k".to_string(), Duration::from_secs(1));
		assert!(matches!(result, Err(IngestError::InvalidUrl(_))));
	}
}
