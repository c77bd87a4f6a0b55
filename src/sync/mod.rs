//! Trackpoint Synchronization Module
//!
//! This module holds the incremental sync engine that moves GPS trackpoints from Garmin
//! Connect to the ingestion endpoint without sending any point twice. Submodules:
//!
//! - `orchestrator`: Drives a run. Pages through activities and applies the steps below to each.
//! - `classifier`: Excludes indoor and stationary activities.
//! - `downloader`: Fetches raw tracks under a bounded retry policy.
//! - `trace_parser`: Turns GPX documents into ordered `GeoPoint`s.
//! - `watermark`: Drops points already delivered in an earlier batch.
//! - `state_persistence` / `repositories`: Durable watermark and the failure ledger.
//! - `progress_tracker`: Per-run counters and the final report.

/// Indoor activity filter
pub mod classifier;
/// Bounded-retry downloads
pub mod downloader;
/// Main coordinator for the sync process
pub mod orchestrator;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// File-backed storage for the watermark and failure ledger
pub mod repositories;
/// Watermark state and failure ledger
pub mod state_persistence;
/// GPX trace parsing
pub mod trace_parser;
/// Shared data and error types
pub mod types;
/// Dedup filter against the watermark
pub mod watermark;

pub use orchestrator::*;
pub use types::*;
