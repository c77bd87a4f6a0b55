//! Fakes and fixtures shared by the unit tests.

use crate::garmin::{ActivityMeta, ActivitySource, SourceError};
use crate::ingest::{BatchUploader, IngestError};
use crate::sync::GeoPoint;

use chrono::DateTime;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept a single connection, answer it with `status` and `body`, and hand back
/// the raw request text through the returned handle.
pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let base = format!("http://{}", listener.local_addr().unwrap());
	let response = format!(
		"HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
		status,
		body.len(),
		body
	);

	let handle = tokio::spawn(async move {
		let (mut socket, _) = listener.accept().await.unwrap();
		let request = read_request(&mut socket).await;
		socket.write_all(response.as_bytes()).await.unwrap();
		socket.shutdown().await.ok();
		request
	});

	(base, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
	let mut buf = Vec::new();
	let mut chunk = [0u8; 4096];

	loop {
		let n = socket.read(&mut chunk).await.unwrap();
		if n == 0 {
			break;
		}
		buf.extend_from_slice(&chunk[..n]);

		let text = String::from_utf8_lossy(&buf);
		if let Some(header_end) = text.find("\r\n\r\n") {
			let content_length = text[..header_end]
				.lines()
				.filter_map(|line| line.split_once(':'))
				.find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
				.and_then(|(_, value)| value.trim().parse::<usize>().ok())
				.unwrap_or(0);
			if buf.len() >= header_end + 4 + content_length {
				break;
			}
		}
	}

	String::from_utf8_lossy(&buf).into_owned()
}

/// An outdoor-by-default activity listing record.
pub fn activity(id: u64, name: &str, type_key: &str) -> ActivityMeta {
	ActivityMeta {
		id,
		name: name.to_string(),
		is_indoor: false,
		activity_type_key: type_key.to_string(),
	}
}

/// A GPX document with one trackpoint per epoch timestamp.
pub fn gpx(timestamps: &[i64]) -> Vec<u8> {
	let trkpts: String = timestamps
		.iter()
		.map(|ts| {
			let time = DateTime::from_timestamp(*ts, 0)
				.unwrap()
				.format("%Y-%m-%dT%H:%M:%S.000Z");
			format!(
				r#"<trkpt lat="31.2" lon="121.4"><ele>5.0</ele><time>{}</time></trkpt>"#,
				time
			)
		})
		.collect();

	format!(
		r#"<?xml version="1.0"?><gpx><trk><trkseg>{}</trkseg></trk></gpx>"#,
		trkpts
	)
	.into_bytes()
}

/// In-memory activity source with scripted download failures.
#[derive(Default)]
pub struct FakeSource {
	activities: Vec<ActivityMeta>,
	tracks: HashMap<u64, Vec<u8>>,
	failures: Mutex<HashMap<u64, u32>>,
	listing_failures: Mutex<HashMap<u32, u32>>,
	reject_session: bool,
	download_calls: Mutex<Vec<u64>>,
	list_calls: Mutex<Vec<(u32, u32)>>,
}

impl FakeSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_activity(mut self, meta: ActivityMeta, track: Vec<u8>) -> Self {
		self.tracks.insert(meta.id, track);
		self.activities.push(meta);
		self
	}

	pub fn with_track(mut self, activity_id: u64, track: Vec<u8>) -> Self {
		self.tracks.insert(activity_id, track);
		self
	}

	/// Make the next `times` downloads of `activity_id` fail.
	pub fn failing(self, activity_id: u64, times: u32) -> Self {
		self.failures.lock().unwrap().insert(activity_id, times);
		self
	}

	/// Make the next `times` listing calls at `offset` fail with a server error.
	pub fn failing_listing(self, offset: u32, times: u32) -> Self {
		self.listing_failures.lock().unwrap().insert(offset, times);
		self
	}

	pub fn rejecting_session(mut self) -> Self {
		self.reject_session = true;
		self
	}

	pub fn download_calls(&self) -> Vec<u64> {
		self.download_calls.lock().unwrap().clone()
	}

	pub fn list_calls(&self) -> Vec<(u32, u32)> {
		self.list_calls.lock().unwrap().clone()
	}

	fn rejected() -> SourceError {
		SourceError::Authentication("session rejected".to_string())
	}
}

#[async_trait::async_trait]
impl ActivitySource for FakeSource {
	async fn authenticate(&self) -> Result<(), SourceError> {
		if self.reject_session {
			return Err(Self::rejected());
		}
		Ok(())
	}

	async fn list_activities(
		&self,
		offset: u32,
		limit: u32,
	) -> Result<Vec<ActivityMeta>, SourceError> {
		self.list_calls.lock().unwrap().push((offset, limit));
		if self.reject_session {
			return Err(Self::rejected());
		}
		if let Some(remaining) = self.listing_failures.lock().unwrap().get_mut(&offset) {
			if *remaining > 0 {
				*remaining -= 1;
				return Err(SourceError::Status {
					status: 503,
					url: format!("fake://activities?start={}", offset),
				});
			}
		}

		let start = (offset as usize).min(self.activities.len());
		let end = (start + limit as usize).min(self.activities.len());
		Ok(self.activities[start..end].to_vec())
	}

	async fn download_track(&self, activity_id: u64) -> Result<Vec<u8>, SourceError> {
		self.download_calls.lock().unwrap().push(activity_id);

		let mut failures = self.failures.lock().unwrap();
		if let Some(remaining) = failures.get_mut(&activity_id) {
			if *remaining > 0 {
				*remaining -= 1;
				return Err(SourceError::Status {
					status: 503,
					url: format!("fake://activity/{}", activity_id),
				});
			}
		}

		self.tracks
			.get(&activity_id)
			.cloned()
			.ok_or_else(|| SourceError::Status {
				status: 404,
				url: format!("fake://activity/{}", activity_id),
			})
	}
}

/// Batch uploader that records accepted batches and fails chosen calls.
#[derive(Default)]
pub struct FakeUploader {
	failing_calls: HashSet<usize>,
	calls: Mutex<usize>,
	accepted: Mutex<Vec<Vec<GeoPoint>>>,
}

impl FakeUploader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reject the `call`-th post (0-based).
	pub fn failing_on(mut self, call: usize) -> Self {
		self.failing_calls.insert(call);
		self
	}

	pub fn accepted_timestamps(&self) -> Vec<Vec<i64>> {
		self.accepted
			.lock()
			.unwrap()
			.iter()
			.map(|batch| batch.iter().map(|p| p.timestamp).collect())
			.collect()
	}
}

#[async_trait::async_trait]
impl BatchUploader for FakeUploader {
	async fn post_batch(&self, points: &[GeoPoint]) -> Result<(), IngestError> {
		let call = {
			let mut calls = self.calls.lock().unwrap();
			*calls += 1;
			*calls - 1
		};
		if self.failing_calls.contains(&call) {
			return Err(IngestError::Status(503));
		}
		self.accepted.lock().unwrap().push(points.to_vec());
		Ok(())
	}
}
