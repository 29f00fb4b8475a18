//! Export job execution
//!
//! The [`ExportProcessor`] owns the lifecycle of export jobs: collection from
//! the data source, rendering, checksumming, and completion/failure
//! publication over watch channels.

pub mod job;
pub mod render;
pub mod service;

pub use job::{compute_checksum, ExportResult, PerformanceMetrics};
pub use service::{ExportProcessor, OperationFailure, OperationSnapshot, OperationStatus};
