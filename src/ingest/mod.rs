//! Downstream GPS ingestion endpoint
//!
//! The sync engine posts batches through `BatchUploader`; `IngestClient` is the
//! HTTP implementation used in production.

/// HTTP client for the batch endpoint
mod client;
/// Request body and error types
mod types;

pub use client::{BatchUploader, IngestClient};
pub use types::*;
