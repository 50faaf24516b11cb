//! Async export job manager.
//!
//! This crate provides:
//! - Trackable export jobs with poll-based status lookups
//! - Background processing raced against a fixed timeout
//! - Staggered batch submission
//! - Retention sweeps and optional durable mirroring of the job table

pub mod error;
pub mod exporter;
pub mod manager;

pub use error::{JobError, JobResult};
pub use exporter::{CdnExporter, JobExportOutput, JobExporter};
pub use manager::{BatchExport, ExportJobManager, JobManagerConfig};
