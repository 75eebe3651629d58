//! Deterministic offline export: fixed-step sampling of a clip into a frame sink.

/// Fixed-step frame sampling and export entry points.
pub mod sampler;
/// Frame consumers: image sequences and in-memory capture.
pub mod sink;
