//! Weighted stage progress and the export job that reports it.

/// Stage weights, overall percentage and ETA.
pub mod composer;
/// Open → sample → convert → clean up orchestration.
pub mod job;
