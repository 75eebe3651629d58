use std::fmt;
use std::path::PathBuf;

use crate::clip::AnimationClip;
use crate::foundation::core::{FillMode, LoopTarget, StretchDirection};

/// Position reported to hosts once per sampling pass.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PlaybackPosition {
    /// Frame on the `ceil(duration * sample_rate)` grid, `0` when the grid has at most one frame.
    pub frame_index: u64,
    /// `elapsed / duration`, in `[0, 1]`.
    pub normalized: f64,
}

/// Host callback receiving [`PlaybackPosition`]s on the render thread.
pub type PositionCallback = Box<dyn FnMut(PlaybackPosition) + Send>;

/// Where a `Start` command gets its clip from.
pub enum ClipSource {
    /// Already decoded by the caller.
    Decoded(Box<dyn AnimationClip>),
    /// Decoded on the render thread. Failures reject the start.
    Path(PathBuf),
}

impl fmt::Debug for ClipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decoded(clip) => f
                .debug_struct("Decoded")
                .field("duration_secs", &clip.duration_secs())
                .finish(),
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
        }
    }
}

/// Parameters carried by a `Start` command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartParams {
    /// Scaling mode.
    pub fill: FillMode,
    /// Scaling restriction.
    pub direction: StretchDirection,
    /// Loops to play before freezing on the last frame.
    pub loop_target: LoopTarget,
    /// Playback speed multiplier, > 0.
    pub speed: f64,
    /// Redraw cap in Hz; `0` disables throttling.
    pub sample_rate_hz: f64,
}

impl Default for StartParams {
    fn default() -> Self {
        Self {
            fill: FillMode::Uniform,
            direction: StretchDirection::Both,
            loop_target: LoopTarget::Infinite,
            speed: 1.0,
            sample_rate_hz: 0.0,
        }
    }
}

/// Partial update applied by a `Refresh` command. `None` fields keep their value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RefreshParams {
    /// New scaling mode.
    pub fill: Option<FillMode>,
    /// New scaling restriction.
    pub direction: Option<StretchDirection>,
    /// New speed multiplier.
    pub speed: Option<f64>,
    /// New redraw cap.
    pub sample_rate_hz: Option<f64>,
}

/// Instruction sent from a control context to a playback session.
///
/// Commands are consumed exactly once, in FIFO order. Overlapping `Refresh` commands resolve
/// last-writer-wins per field.
pub enum Command {
    /// Take ownership of a clip and play it from the start.
    Start {
        /// Clip to play.
        clip: ClipSource,
        /// Initial configuration.
        params: StartParams,
    },
    /// Stop playing. The clip is kept.
    Stop,
    /// Freeze time at the current position.
    Pause,
    /// Continue after `Pause`.
    Resume,
    /// Jump to an absolute time, counted across loops.
    Seek {
        /// Seconds since the start of the first loop.
        time_secs: f64,
    },
    /// Update configuration fields.
    Refresh(RefreshParams),
    /// Replace the loop target without touching the position.
    RefreshLoopTarget(LoopTarget),
    /// Replace (or clear) the position callback.
    SetPositionCallback(Option<PositionCallback>),
    /// Stop and release the clip and callback.
    Terminate,
}

impl Command {
    /// Short tag used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Seek { .. } => "seek",
            Self::Refresh(_) => "refresh",
            Self::RefreshLoopTarget(_) => "refresh_loop_target",
            Self::SetPositionCallback(_) => "set_position_callback",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start { clip, params } => f
                .debug_struct("Start")
                .field("clip", clip)
                .field("params", params)
                .finish(),
            Self::Seek { time_secs } => f
                .debug_struct("Seek")
                .field("time_secs", time_secs)
                .finish(),
            Self::Refresh(p) => f.debug_tuple("Refresh").field(p).finish(),
            Self::RefreshLoopTarget(t) => f.debug_tuple("RefreshLoopTarget").field(t).finish(),
            Self::SetPositionCallback(cb) => f
                .debug_tuple("SetPositionCallback")
                .field(&cb.as_ref().map(|_| "<callback>"))
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}
