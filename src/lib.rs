//! vanim samples vector animation clips against time.
//!
//! Two paths share one clip contract ([`AnimationClip`]):
//!
//! - Interactive playback: send [`Command`]s to a [`PlaybackHandle`], which runs a
//!   [`PlaybackSession`] on its own thread, advances elapsed time from the wall clock, loops,
//!   throttles redraws and presents frames to a [`RenderTarget`].
//! - Batch export: sample a clip on a fixed frame grid with [`sample_frames`] /
//!   [`export_frames`], or run a whole [`ExportJob`] that reports weighted [`StageProgress`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod batch;
pub mod clip;
pub mod config;
pub mod playback;
pub mod progress;
/// Surfaces, layout and presentation targets.
pub mod render;

pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{
    Affine, FillMode, Fps, FrameIndex, LoopTarget, PixelSize, Rect, StretchDirection,
};
pub use crate::foundation::error::{VanimError, VanimResult};

pub use crate::batch::sampler::{
    BatchOpts, BatchOutcome, CancelToken, ExportSession, FrameProgress, export_clip_file,
    export_frames, frame_count, frame_times, sample_frames,
};
pub use crate::batch::sink::{FrameSink, ImageSequenceSink, InMemorySink, SinkConfig};
pub use crate::clip::svg_sequence::SvgSequenceClip;
pub use crate::clip::{AnimationClip, ClipInfo, open_clip, validate_clip};
pub use crate::config::{ExportConfig, PlayerConfig};
pub use crate::playback::actor::{PlaybackHandle, SessionEvent, SessionOpts};
pub use crate::playback::command::{
    ClipSource, Command, PlaybackPosition, PositionCallback, RefreshParams, StartParams,
};
pub use crate::playback::sampler::{PlaybackPhase, PlaybackState};
pub use crate::playback::session::{CommandOutcome, PlaybackSession, TickOutcome};
pub use crate::progress::composer::{ProgressComposer, Stage, StageProgress};
pub use crate::progress::job::{ConvertRequest, ExportJob, FrameConverter, JobOutcome};
pub use crate::render::fit::fit_rect;
pub use crate::render::surface::{FrameFormat, Surface};
pub use crate::render::target::{FrameSlot, RenderTarget};
