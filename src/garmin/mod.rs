//! Upstream integration for Garmin Connect
//!
//! This module provides the activity source seam and its HTTP implementation.
//! The sync engine only sees `ActivitySource`, `ActivityMeta` and `SourceError`.

/// HTTP client for the Garmin Connect API
mod client;
/// Type definitions for listing records and errors
mod types;

pub use client::{ActivitySource, GarminConnectClient};
pub use types::*;
