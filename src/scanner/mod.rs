//! Multi-root scanning.
//!
//! - [`coordinator`] - one worker per root, results drained from a channel
pub mod coordinator;

pub use coordinator::{AggregateResult, ScanResult, WorkerReport, run_workers, scan};
