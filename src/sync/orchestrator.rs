//! Trackpoint sync orchestrator and integration point for all sync services.
//!
//! This module defines the `SyncOrchestrator`, which drives one incremental export run:
//! it pages through the upstream activity listing and pushes each exportable activity
//! through download, GPX parsing, watermark filtering and upload, advancing the durable
//! watermark after every accepted batch.
//!
//! The orchestrator is responsible for:
//! - Checking the upstream session before any sync work
//! - Paging through activities in listing order until an empty page
//! - Turning per-activity failures into skips or failure-ledger entries
//! - Persisting the watermark after each successful upload
//! - Reporting totals and writing the failure ledger at the end of the run
//!
//! Only a rejected session, a listing that keeps failing, or a watermark that cannot be
//! persisted stops a run; everything else is logged and the loop moves on. A run that
//! stops after listing began still writes its failure ledger and logs its report.

use crate::garmin::{ActivityMeta, ActivitySource};
use crate::ingest::BatchUploader;
use crate::sync::{
    classifier::is_exportable,
    downloader::{ResilientDownloader, RetryConfig},
    progress_tracker::{SyncProgressTracker, SyncReport},
    state_persistence::{FailureLedger, StatePersistenceService, SyncState},
    trace_parser,
    types::SyncError,
    watermark::{filter_new, max_timestamp},
};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Activities requested per listing page.
    pub page_size: u32,
    /// Retry policy for listing and downloads.
    pub retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            retry: RetryConfig::default(),
        }
    }
}

/// Main sync orchestrator that coordinates all sync components.
///
/// The downloader and uploader are stateless; the watermark is created by `sync` and
/// owned by it for the duration of the run.
pub struct SyncOrchestrator {
    source: Arc<dyn ActivitySource>,
    uploader: Arc<dyn BatchUploader>,
    downloader: ResilientDownloader,
    persistence_service: StatePersistenceService,
    page_size: u32,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        uploader: Arc<dyn BatchUploader>,
        persistence_service: StatePersistenceService,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            source,
            uploader,
            downloader: ResilientDownloader::new(config.retry),
            persistence_service,
            page_size: config.page_size.max(1),
        }
    }

    /// Run one full sync pass.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        info!("Starting trackpoint synchronization");

        self.source
            .authenticate()
            .await
            .map_err(SyncError::Authentication)?;

        let mut state = self.persistence_service.restore_sync_state().await?;
        let mut tracker = SyncProgressTracker::new(state.last_uploaded_timestamp());
        let mut ledger = FailureLedger::default();

        let outcome = self
            .process_pages(&mut state, &mut tracker, &mut ledger)
            .await;

        tracker.log_progress(true);

        if !ledger.is_empty() {
            warn!(
                "{} activities failed to download: {:?}",
                ledger.activity_ids().len(),
                ledger.activity_ids()
            );
            if let Err(e) = self.persistence_service.save_failure_ledger(&ledger).await {
                error!("Failed to write failure ledger: {}", e);
            }
        }

        let report = tracker.report(
            ledger.activity_ids().to_vec(),
            state.last_uploaded_timestamp(),
        );
        info!("{}", report.summary());

        outcome?;

        info!(
            "Trackpoint synchronization completed, {} points sent",
            tracker.points_sent()
        );
        Ok(report)
    }

    /// Page through the listing until an empty page, processing every activity.
    ///
    /// Stops at the first listing or watermark persistence failure.
    async fn process_pages(
        &self,
        state: &mut SyncState,
        tracker: &mut SyncProgressTracker,
        ledger: &mut FailureLedger,
    ) -> Result<(), SyncError> {
        let mut offset = 0u32;
        loop {
            let page = self
                .downloader
                .list_page(self.source.as_ref(), offset, self.page_size)
                .await
                .map_err(|source| SyncError::Listing { offset, source })?;

            if page.is_empty() {
                debug!("Empty page at offset {}, listing exhausted", offset);
                return Ok(());
            }

            info!("Processing {} activities from offset {}", page.len(), offset);
            for activity in &page {
                self.process_activity(activity, state, tracker, ledger)
                    .await?;
                tracker.log_progress(false);
            }

            offset = offset.saturating_add(self.page_size);
        }
    }

    /// Push one activity through classify, download, parse, filter and upload.
    ///
    /// Only a watermark persistence failure is returned as an error.
    async fn process_activity(
        &self,
        activity: &ActivityMeta,
        state: &mut SyncState,
        tracker: &mut SyncProgressTracker,
        ledger: &mut FailureLedger,
    ) -> Result<(), SyncError> {
        tracker.record_seen();

        if !is_exportable(activity) {
            debug!(
                "Skipping indoor activity {} ({:?}, type {:?})",
                activity.id, activity.name, activity.activity_type_key
            );
            tracker.record_not_exportable();
            return Ok(());
        }

        let raw = match self
            .downloader
            .download(self.source.as_ref(), activity.id)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!("{}", e);
                ledger.record(activity.id);
                return Ok(());
            }
        };

        let points = match trace_parser::parse(&raw) {
            Ok(points) => points,
            Err(e) => {
                warn!("Skipping activity {}: {}", activity.id, e);
                tracker.record_malformed();
                return Ok(());
            }
        };
        if points.is_empty() {
            debug!("Activity {} has no usable trackpoints", activity.id);
            tracker.record_empty();
            return Ok(());
        }

        let new_points = filter_new(&points, state.last_uploaded_timestamp());
        if new_points.is_empty() {
            debug!(
                "Activity {}: all {} points at or before watermark {}",
                activity.id,
                points.len(),
                state.last_uploaded_timestamp()
            );
            tracker.record_empty();
            return Ok(());
        }

        match self.uploader.post_batch(&new_points).await {
            Ok(()) => {
                info!(
                    "Activity {}: uploaded {} of {} points",
                    activity.id,
                    new_points.len(),
                    points.len()
                );
                tracker.record_uploaded(new_points.len());
                if let Some(newest) = max_timestamp(&new_points) {
                    state.advance(newest).await?;
                }
            }
            Err(e) => {
                warn!(
                    "Activity {}: upload of {} points failed, left for next run: {}",
                    activity.id,
                    new_points.len(),
                    e
                );
                tracker.record_upload_failure();
            }
        }

        Ok(())
    }
}
