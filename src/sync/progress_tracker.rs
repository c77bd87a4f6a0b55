//! Progress tracking for trackpoint synchronization.
//!
//! The `SyncProgressTracker` counts what happened to each listed activity during one
//! run and produces the `SyncReport` the orchestrator logs and returns at the end.

use tracing::info;

/// Log a progress line every this many activities.
const PROGRESS_LOG_INTERVAL: usize = 50;

/// Service for tracking synchronization progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
    /// Watermark at the start of the run
    start_watermark: i64,
    activities_seen: usize,
    activities_uploaded: usize,
    skipped_not_exportable: usize,
    skipped_empty: usize,
    skipped_malformed: usize,
    upload_failures: usize,
    points_sent: usize,
    /// Activity count at which we last logged progress
    last_logged_at: usize,
}

impl SyncProgressTracker {
    /// Create a new progress tracker for a run starting at the given watermark.
    pub fn new(start_watermark: i64) -> Self {
        Self {
            start_watermark,
            activities_seen: 0,
            activities_uploaded: 0,
            skipped_not_exportable: 0,
            skipped_empty: 0,
            skipped_malformed: 0,
            upload_failures: 0,
            points_sent: 0,
            last_logged_at: 0,
        }
    }

    pub fn record_seen(&mut self) {
        self.activities_seen += 1;
    }

    pub fn record_not_exportable(&mut self) {
        self.skipped_not_exportable += 1;
    }

    /// Record an activity with no new points, either an empty trace or all behind the watermark
    pub fn record_empty(&mut self) {
        self.skipped_empty += 1;
    }

    pub fn record_malformed(&mut self) {
        self.skipped_malformed += 1;
    }

    pub fn record_upload_failure(&mut self) {
        self.upload_failures += 1;
    }

    pub fn record_uploaded(&mut self, points: usize) {
        self.activities_uploaded += 1;
        self.points_sent += points;
    }

    pub fn points_sent(&self) -> usize {
        self.points_sent
    }

    /// Log progress at regular intervals or when forced
    pub fn log_progress(&mut self, force: bool) {
        let since_last_log = self.activities_seen.saturating_sub(self.last_logged_at);
        if force || since_last_log >= PROGRESS_LOG_INTERVAL {
            info!(
                "Sync progress: {} activities seen, {} uploaded, {} points sent",
                self.activities_seen, self.activities_uploaded, self.points_sent
            );
            self.last_logged_at = self.activities_seen;
        }
    }

    /// Build the end-of-run report.
    ///
    /// Download failures come from the run's failure ledger.
    pub fn report(&self, failed_downloads: Vec<u64>, final_watermark: i64) -> SyncReport {
        SyncReport {
            start_watermark: self.start_watermark,
            final_watermark,
            activities_seen: self.activities_seen,
            activities_uploaded: self.activities_uploaded,
            skipped_not_exportable: self.skipped_not_exportable,
            skipped_empty: self.skipped_empty,
            skipped_malformed: self.skipped_malformed,
            upload_failures: self.upload_failures,
            points_sent: self.points_sent,
            failed_downloads,
        }
    }
}

/// Outcome of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub start_watermark: i64,
    pub final_watermark: i64,
    pub activities_seen: usize,
    pub activities_uploaded: usize,
    pub skipped_not_exportable: usize,
    pub skipped_empty: usize,
    pub skipped_malformed: usize,
    pub upload_failures: usize,
    /// Total trackpoints accepted downstream.
    pub points_sent: usize,
    /// Activity ids that exhausted their download retries, in processing order.
    pub failed_downloads: Vec<u64>,
}

impl SyncReport {
    /// Get a human-readable summary of the run
    pub fn summary(&self) -> String {
        format!(
            "Sent {} trackpoints from {} activities ({} seen, {} indoor, {} without new points, {} malformed, {} upload failures, {} download failures); watermark {} -> {}",
            self.points_sent,
            self.activities_uploaded,
            self.activities_seen,
            self.skipped_not_exportable,
            self.skipped_empty,
            self.skipped_malformed,
            self.upload_failures,
            self.failed_downloads.len(),
            self.start_watermark,
            self.final_watermark
        )
    }
}
