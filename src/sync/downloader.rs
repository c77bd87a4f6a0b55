//! Bounded-retry wrapper around upstream calls.
//!
//! Every download is attempted up to `max_attempts` times with a wait between
//! attempts. Exhausting the attempts yields [`DownloadFailed`], which the
//! orchestrator records instead of aborting the run.

use crate::garmin::{ActivityMeta, ActivitySource, SourceError};

use backoff::backoff::{Backoff, Constant};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How the wait between attempts evolves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
	/// Same delay before every retry.
	#[default]
	Fixed,
	/// Doubling, jittered delay starting at the configured delay.
	Exponential,
}

/// Retry policy for upstream calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts, including the first one.
	pub max_attempts: u32,
	/// Wait before the first retry (and every retry for `Fixed`).
	pub delay: Duration,
	pub strategy: RetryStrategy,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			delay: Duration::from_secs(5),
			strategy: RetryStrategy::Fixed,
		}
	}
}

impl RetryConfig {
	fn backoff(&self) -> AttemptLimited<PolicyBackoff> {
		let inner = match self.strategy {
			RetryStrategy::Fixed => PolicyBackoff::Fixed(Constant::new(self.delay)),
			RetryStrategy::Exponential => PolicyBackoff::Exponential(self.exponential()),
		};
		AttemptLimited::new(inner, self.max_attempts)
	}

	fn exponential(&self) -> ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.delay)
			.with_multiplier(2.0)
			.with_max_interval(self.delay * 8)
			.with_max_elapsed_time(None)
			.build()
	}
}

enum PolicyBackoff {
	Fixed(Constant),
	Exponential(ExponentialBackoff),
}

impl Backoff for PolicyBackoff {
	fn reset(&mut self) {
		match self {
			PolicyBackoff::Fixed(b) => b.reset(),
			PolicyBackoff::Exponential(b) => b.reset(),
		}
	}

	fn next_backoff(&mut self) -> Option<Duration> {
		match self {
			PolicyBackoff::Fixed(b) => b.next_backoff(),
			PolicyBackoff::Exponential(b) => b.next_backoff(),
		}
	}
}

/// Caps any backoff at a total number of attempts.
pub struct AttemptLimited<B> {
	inner: B,
	max_attempts: u32,
	retries: u32,
}

impl<B: Backoff> AttemptLimited<B> {
	pub fn new(inner: B, max_attempts: u32) -> Self {
		Self {
			inner,
			max_attempts: max_attempts.max(1),
			retries: 0,
		}
	}
}

impl<B: Backoff> Backoff for AttemptLimited<B> {
	fn reset(&mut self) {
		self.retries = 0;
		self.inner.reset();
	}

	fn next_backoff(&mut self) -> Option<Duration> {
		// Called after a failed attempt; `retries + 1` attempts have been made.
		if self.retries + 1 >= self.max_attempts {
			return None;
		}
		self.retries += 1;
		self.inner.next_backoff()
	}
}

/// An activity whose track could not be fetched within the retry budget.
#[derive(Debug, thiserror::Error)]
#[error("Download of activity {activity_id} failed after {attempts} attempts: {last_error}")]
pub struct DownloadFailed {
	pub activity_id: u64,
	pub attempts: u32,
	pub last_error: SourceError,
}

/// Stateless downloader; the activity source is passed in on every call.
#[derive(Debug, Clone, Default)]
pub struct ResilientDownloader {
	config: RetryConfig,
}

impl ResilientDownloader {
	pub fn new(config: RetryConfig) -> Self {
		Self { config }
	}

	/// Download one activity's track, retrying every error.
	pub async fn download(
		&self,
		source: &dyn ActivitySource,
		activity_id: u64,
	) -> Result<Vec<u8>, DownloadFailed> {
		let what = format!("download of activity {}", activity_id);
		let (result, attempts) = self
			.run(&what, || async move {
				source
					.download_track(activity_id)
					.await
					.map_err(backoff::Error::transient)
			})
			.await;

		result.map_err(|last_error| DownloadFailed {
			activity_id,
			attempts,
			last_error,
		})
	}

	/// List one page of activities under the same policy.
	///
	/// A rejected session is not retried.
	pub async fn list_page(
		&self,
		source: &dyn ActivitySource,
		offset: u32,
		limit: u32,
	) -> Result<Vec<ActivityMeta>, SourceError> {
		let what = format!("listing at offset {}", offset);
		let (result, _) = self
			.run(&what, || async move {
				source
					.list_activities(offset, limit)
					.await
					.map_err(|e| match e {
						SourceError::Authentication(_) => backoff::Error::permanent(e),
						other => backoff::Error::transient(other),
					})
			})
			.await;
		result
	}

	async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> (Result<T, SourceError>, u32)
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, backoff::Error<SourceError>>>,
	{
		let mut attempts = 0u32;
		let result = backoff::future::retry_notify(
			self.config.backoff(),
			|| {
				attempts += 1;
				debug!("Attempt {} of {}", attempts, what);
				operation()
			},
			|err: SourceError, wait: Duration| {
				warn!("{} failed: {}; retrying in {:?}", what, err, wait);
			},
		)
		.await;

		(result, attempts)
	}
}
