//! State persistence for trackpoint synchronization.
//!
//! This module provides the `SyncState` watermark, the per-run `FailureLedger`, and the
//! `StatePersistenceService` that restores the former and writes out the latter. Storage
//! details live behind the repository traits so the orchestrator only deals with values.
//!
//! The watermark is the single durable dedup boundary: it only moves forward, and every
//! move is written to disk before it becomes visible in memory.

use crate::sync::repositories::{
    FailureLedgerRepository, FileFailureLedgerRepository, FileWatermarkRepository,
    WatermarkRepository,
};
use crate::sync::types::StateError;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// The durable high-water mark of delivered trackpoints.
///
/// Owned by the orchestrator; `advance` is the only way to change it.
pub struct SyncState {
    last_uploaded_timestamp: i64,
    repo: Arc<dyn WatermarkRepository>,
}

impl SyncState {
    /// Timestamp of the newest point known to be accepted downstream.
    pub fn last_uploaded_timestamp(&self) -> i64 {
        self.last_uploaded_timestamp
    }

    /// Move the watermark to `candidate` if it is strictly newer, persisting first.
    ///
    /// Returns `Ok(false)` and leaves the state untouched otherwise.
    pub async fn advance(&mut self, candidate: i64) -> Result<bool, StateError> {
        if candidate <= self.last_uploaded_timestamp {
            return Ok(false);
        }

        self.repo.save(candidate).await?;
        info!(
            "Watermark advanced from {} to {}",
            self.last_uploaded_timestamp, candidate
        );
        self.last_uploaded_timestamp = candidate;
        Ok(true)
    }
}

/// Activity ids whose downloads exhausted their retries during one run.
#[derive(Debug, Clone, Default)]
pub struct FailureLedger {
    activity_ids: Vec<u64>,
}

impl FailureLedger {
    pub fn record(&mut self, activity_id: u64) {
        self.activity_ids.push(activity_id);
    }

    pub fn is_empty(&self) -> bool {
        self.activity_ids.is_empty()
    }

    pub fn activity_ids(&self) -> &[u64] {
        &self.activity_ids
    }
}

/// Service for loading the watermark and writing the failure ledger.
pub struct StatePersistenceService {
    watermark_repo: Arc<dyn WatermarkRepository>,
    ledger_repo: Box<dyn FailureLedgerRepository>,
}

impl StatePersistenceService {
    /// Create a new state persistence service for the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            watermark_repo: Arc::new(FileWatermarkRepository::new(data_dir.clone())),
            ledger_repo: Box::new(FileFailureLedgerRepository::new(data_dir)),
        }
    }

    /// Load the watermark, starting from 0 when nothing has been persisted yet.
    pub async fn restore_sync_state(&self) -> Result<SyncState, StateError> {
        let last_uploaded_timestamp = match self.watermark_repo.load().await? {
            Some(timestamp) => timestamp,
            None => {
                info!("No persisted watermark found, starting from 0");
                0
            }
        };

        Ok(SyncState {
            last_uploaded_timestamp,
            repo: self.watermark_repo.clone(),
        })
    }

    /// Write the ledger side file; an empty ledger writes nothing.
    pub async fn save_failure_ledger(&self, ledger: &FailureLedger) -> Result<(), StateError> {
        if ledger.is_empty() {
            return Ok(());
        }
        self.ledger_repo.save(ledger.activity_ids()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_restore_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let service = StatePersistenceService::new(dir.path().to_path_buf());

        let state = service.restore_sync_state().await.unwrap();
        assert_eq!(state.last_uploaded_timestamp(), 0);
    }

    #[tokio::test]
    async fn test_advance_is_monotonic_and_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let service = StatePersistenceService::new(dir.path().to_path_buf());
        let mut state = service.restore_sync_state().await.unwrap();

        assert!(state.advance(300).await.unwrap());
        assert!(!state.advance(200).await.unwrap());
        assert!(!state.advance(300).await.unwrap());
        assert_eq!(state.last_uploaded_timestamp(), 300);

        let restarted = StatePersistenceService::new(dir.path().to_path_buf())
            .restore_sync_state()
            .await
            .unwrap();
        assert_eq!(restarted.last_uploaded_timestamp(), 300);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_watermark_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let service = StatePersistenceService::new(missing);
        let mut state = service.restore_sync_state().await.unwrap();

        assert!(state.advance(10).await.is_err());
        assert_eq!(state.last_uploaded_timestamp(), 0);
    }

    #[tokio::test]
    async fn test_empty_ledger_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = StatePersistenceService::new(dir.path().to_path_buf());

        service
            .save_failure_ledger(&FailureLedger::default())
            .await
            .unwrap();
        assert!(!dir.path().join("failed_activities.txt").exists());

        let mut ledger = FailureLedger::default();
        ledger.record(5);
        service.save_failure_ledger(&ledger).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("failed_activities.txt")).unwrap(),
            "5\n"
        );
    }
}
