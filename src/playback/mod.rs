//! Interactive playback: commands, the session state machine, the redraw throttle and the render
//! thread that drives them.

/// Render scheduling thread and its control handle.
pub mod actor;
/// Command messages.
pub mod command;
/// Time-advance and loop rules.
pub mod sampler;
/// Session state machine.
pub mod session;
/// Redraw throttle.
pub mod throttle;
