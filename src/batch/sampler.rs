use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::batch::sink::{FrameSink, ImageSequenceSink, SinkConfig};
use crate::clip::{AnimationClip, open_clip, validate_clip};
use crate::foundation::core::{Fps, FrameIndex, PixelSize, validate_speed};
use crate::foundation::error::{VanimError, VanimResult};
use crate::render::surface::{FrameFormat, MAX_SURFACE_DIM, Surface};

/// Guards `ceil` against float noise such as `2.0000000000000004`.
const FRAME_COUNT_EPSILON: f64 = 1e-9;

/// Options for a deterministic frame export.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOpts {
    /// Output frame rate.
    pub fps: Fps,
    /// Animation seconds per output second.
    pub speed: f64,
    /// Output width; inferred from the clip aspect ratio when only `height` is set. With both
    /// sides set the clip is stretched to fill the output and its aspect ratio is not kept.
    pub width: Option<u32>,
    /// Output height; inferred from the clip aspect ratio when only `width` is set. See `width`
    /// for the stretch when both are set.
    pub height: Option<u32>,
    /// Image format for file sinks.
    pub format: FrameFormat,
}

impl Default for BatchOpts {
    fn default() -> Self {
        Self {
            fps: Fps { num: 30, den: 1 },
            speed: 1.0,
            width: None,
            height: None,
            format: FrameFormat::Png,
        }
    }
}

impl BatchOpts {
    /// Options at `fps` with natural size and normal speed.
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            ..Self::default()
        }
    }

    /// Reject non-positive fps, non-positive speed and zero dimensions.
    pub fn validate(&self) -> VanimResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(VanimError::validation("fps must be > 0"));
        }
        validate_speed(self.speed)?;
        if self.width == Some(0) || self.height == Some(0) {
            return Err(VanimError::validation("output width/height must be > 0"));
        }
        Ok(())
    }

    /// Final output size for a clip of `natural` size.
    pub fn output_size(&self, natural: PixelSize) -> VanimResult<PixelSize> {
        resolve_output_size(natural, self.width, self.height)
    }
}

/// Pick the output size: explicit sides win, a single side keeps the natural aspect ratio.
pub fn resolve_output_size(
    natural: PixelSize,
    width: Option<u32>,
    height: Option<u32>,
) -> VanimResult<PixelSize> {
    let scaled = |side: u32, num: u32, den: u32| -> u32 {
        let v = (f64::from(side) * f64::from(num) / f64::from(den)).round();
        (v as u32).max(1)
    };
    let size = match (width, height) {
        (Some(w), Some(h)) => PixelSize::new(w, h),
        (Some(w), None) if !natural.is_empty() => {
            PixelSize::new(w, scaled(w, natural.height, natural.width))
        }
        (None, Some(h)) if !natural.is_empty() => {
            PixelSize::new(scaled(h, natural.width, natural.height), h)
        }
        (None, None) => natural,
        _ => {
            return Err(VanimError::validation(
                "cannot infer output size from an empty natural size",
            ));
        }
    };
    if size.is_empty() || size.width > MAX_SURFACE_DIM || size.height > MAX_SURFACE_DIM {
        return Err(VanimError::validation(format!(
            "output size {}x{} out of range (1..={MAX_SURFACE_DIM})",
            size.width, size.height
        )));
    }
    Ok(size)
}

/// Number of output frames: `ceil(duration / speed * fps)`.
pub fn frame_count(duration_secs: f64, fps: Fps, speed: f64) -> u64 {
    if duration_secs.is_nan() || duration_secs <= 0.0 || speed.is_nan() || speed <= 0.0 {
        return 0;
    }
    if fps.num == 0 || fps.den == 0 {
        return 0;
    }
    let exact = duration_secs / speed * fps.as_f64();
    (exact - FRAME_COUNT_EPSILON).ceil().max(0.0) as u64
}

/// Animation time sampled for output frame `idx`, clamped to the clip duration.
pub fn frame_time(idx: FrameIndex, fps: Fps, speed: f64, duration_secs: f64) -> f64 {
    (fps.frame_to_secs(idx) * speed).min(duration_secs)
}

/// Iterator over `(frame index, animation time)` pairs of an export.
#[derive(Clone, Debug)]
pub struct FrameTimes {
    fps: Fps,
    speed: f64,
    duration_secs: f64,
    next: u64,
    total: u64,
}

impl Iterator for FrameTimes {
    type Item = (FrameIndex, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let idx = FrameIndex(self.next);
        self.next += 1;
        Some((idx, frame_time(idx, self.fps, self.speed, self.duration_secs)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

/// All sample points of an export of a clip lasting `duration_secs`.
pub fn frame_times(duration_secs: f64, fps: Fps, speed: f64) -> FrameTimes {
    FrameTimes {
        fps,
        speed,
        duration_secs,
        next: 0,
        total: frame_count(duration_secs, fps, speed),
    }
}

/// Cooperative cancellation flag shared between the caller and a running export.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the export stops before its next frame.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-frame report delivered after a frame has been handed to the sink.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameProgress {
    /// 1-based number of the frame just written.
    pub frame: u64,
    /// Total frames of the export.
    pub total: u64,
    /// Name the sink stored the frame under.
    pub name: String,
    /// Wall-clock time since sampling began.
    pub elapsed: Duration,
}

impl FrameProgress {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.frame as f64 / self.total as f64
        }
    }
}

/// Bookkeeping of an export in flight.
#[derive(Clone, Debug)]
pub struct ExportSession {
    /// Frames the export will produce.
    pub total_frames: u64,
    /// Frames written so far.
    pub current_frame: u64,
    /// Wall-clock start of sampling.
    pub started_at: Instant,
}

impl ExportSession {
    fn new(total_frames: u64) -> Self {
        Self {
            total_frames,
            current_frame: 0,
            started_at: Instant::now(),
        }
    }
}

/// Result of a batch export that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every frame was written.
    Completed {
        /// Frames written.
        frames: u64,
    },
    /// The cancel token fired; already written frames are left in place.
    Cancelled {
        /// Frames written before cancellation.
        frames_written: u64,
    },
}

impl BatchOutcome {
    /// `true` only for [`BatchOutcome::Completed`].
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Frames written either way.
    pub fn frames_written(self) -> u64 {
        match self {
            Self::Completed { frames } => frames,
            Self::Cancelled { frames_written } => frames_written,
        }
    }
}

/// Sample `clip` at fixed time steps and push every frame into `sink`.
///
/// Frame `i` shows the clip at `min(i / fps * speed, duration)`. The clip is stretched over the
/// whole output surface. `progress` runs after each frame; a panic inside it is logged and
/// ignored. Cancellation is checked before each frame.
#[tracing::instrument(level = "info", skip(clip, sink, cancel, progress))]
pub fn sample_frames(
    clip: &mut dyn AnimationClip,
    opts: &BatchOpts,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(&FrameProgress),
) -> VanimResult<BatchOutcome> {
    opts.validate()?;
    validate_clip(clip)?;

    let duration = clip.duration_secs();
    let size = opts.output_size(clip.natural_size())?;
    let times = frame_times(duration, opts.fps, opts.speed);
    let mut session = ExportSession::new(times.total);
    info!(
        frames = session.total_frames,
        width = size.width,
        height = size.height,
        duration_secs = duration,
        "sampling frames"
    );

    sink.begin(SinkConfig {
        width: size.width,
        height: size.height,
        fps: opts.fps,
        frame_count: session.total_frames,
    })?;

    let mut surface = Surface::new(size)?;
    let dest = size.to_rect();
    for (idx, t) in times {
        if cancel.is_cancelled() {
            info!(frames_written = session.current_frame, "export cancelled");
            return Ok(BatchOutcome::Cancelled {
                frames_written: session.current_frame,
            });
        }

        surface.clear();
        clip.seek_and_render(t, &mut surface, dest)?;
        let name = sink.push_frame(idx, &surface)?;
        session.current_frame += 1;
        debug!(frame = idx.0, time_secs = t, name = %name, "frame written");

        let report = FrameProgress {
            frame: session.current_frame,
            total: session.total_frames,
            name,
            elapsed: session.started_at.elapsed(),
        };
        if catch_unwind(AssertUnwindSafe(|| progress(&report))).is_err() {
            warn!(frame = report.frame, "progress callback panicked; continuing export");
        }
    }

    sink.end()?;
    info!(
        frames = session.current_frame,
        elapsed_ms = session.started_at.elapsed().as_millis() as u64,
        "export complete"
    );
    Ok(BatchOutcome::Completed {
        frames: session.current_frame,
    })
}

/// Export `clip` as an image sequence `00000.<ext>, 00001.<ext>, ...` into `out_dir`.
pub fn export_frames(
    clip: &mut dyn AnimationClip,
    out_dir: &Path,
    opts: &BatchOpts,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(&FrameProgress),
) -> VanimResult<BatchOutcome> {
    opts.validate()?;
    let mut sink = ImageSequenceSink::new(out_dir, opts.format);
    sample_frames(clip, opts, &mut sink, cancel, progress)
}

/// Open the clip at `clip_path` and export it into `out_dir`.
///
/// The clip is released when the export returns, whatever the outcome.
pub fn export_clip_file(
    clip_path: &Path,
    out_dir: &Path,
    opts: &BatchOpts,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(&FrameProgress),
) -> VanimResult<BatchOutcome> {
    opts.validate()?;
    let mut clip = open_clip(clip_path)?;
    export_frames(clip.as_mut(), out_dir, opts, cancel, progress)
}

#[cfg(test)]
#[path = "../../tests/unit/batch/sampler.rs"]
mod tests;
