use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::batch::sampler::{BatchOpts, BatchOutcome, CancelToken, export_frames};
use crate::clip::open_clip;
use crate::config::ExportConfig;
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::{Fps, PixelSize};
use crate::foundation::error::VanimResult;
use crate::progress::composer::{ProgressComposer, Stage, StageProgress};
use crate::render::surface::FrameFormat;

/// Frames handed to a [`FrameConverter`].
#[derive(Clone, Copy, Debug)]
pub struct ConvertRequest<'a> {
    /// Directory holding the frame files.
    pub frames_dir: &'a Path,
    /// Frame file names in display order.
    pub frame_names: &'a [String],
    /// Frame rate of the sequence.
    pub fps: Fps,
    /// Frame size.
    pub size: PixelSize,
    /// Frame file format.
    pub format: FrameFormat,
}

/// Turns a written frame sequence into something else, e.g. a video file.
pub trait FrameConverter: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Consume the sequence. `progress` takes a percentage in `0..=100`.
    fn convert(
        &mut self,
        req: &ConvertRequest<'_>,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(f64),
    ) -> VanimResult<()>;
}

/// How an [`ExportJob`] ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// All stages ran.
    Completed {
        /// Frames sampled.
        frames: u64,
        /// Whether a converter consumed the frames.
        converted: bool,
    },
    /// The cancel token fired during sampling or conversion.
    Cancelled {
        /// Frames written before cancellation.
        frames_written: u64,
    },
}

impl JobOutcome {
    /// `true` only for [`JobOutcome::Completed`].
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A full export: open, sample, optionally convert, clean up.
///
/// Progress is reported as [`StageProgress`] events whose overall percentage never decreases.
pub struct ExportJob {
    source: PathBuf,
    out_dir: PathBuf,
    opts: BatchOpts,
    keep_frames: bool,
    converter: Option<Box<dyn FrameConverter>>,
    clock: Arc<dyn Clock>,
}

impl ExportJob {
    /// Export `source` into `out_dir` with `opts`, keeping frames and without a converter.
    pub fn new(source: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, opts: BatchOpts) -> Self {
        Self {
            source: source.into(),
            out_dir: out_dir.into(),
            opts,
            keep_frames: true,
            converter: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Job described by an [`ExportConfig`].
    pub fn from_config(cfg: &ExportConfig) -> Self {
        Self::new(&cfg.source, &cfg.out_dir, cfg.batch_opts()).keep_frames(cfg.keep_frames)
    }

    /// Attach a converter that runs after sampling.
    pub fn with_converter(mut self, converter: Box<dyn FrameConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Whether frame files survive a successful conversion.
    pub fn keep_frames(mut self, keep: bool) -> Self {
        self.keep_frames = keep;
        self
    }

    /// Clock used for elapsed time and ETA.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run every stage in order.
    ///
    /// Errors from decoding, sampling or conversion abort the job. Cancellation does not.
    #[tracing::instrument(level = "info", skip_all, fields(source = %self.source.display()))]
    pub fn run(
        &mut self,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&StageProgress),
    ) -> VanimResult<JobOutcome> {
        let mut reporter = Reporter {
            composer: ProgressComposer::new(Arc::clone(&self.clock)),
            sink: on_progress,
        };

        reporter.report(Stage::Initializing, 0.0);
        self.opts.validate()?;
        let mut clip = open_clip(&self.source)?;
        let size = self.opts.output_size(clip.natural_size())?;
        reporter.report(Stage::Initializing, 100.0);

        reporter.report(Stage::Sampling, 0.0);
        let mut names = Vec::new();
        let sampled = export_frames(clip.as_mut(), &self.out_dir, &self.opts, cancel, &mut |fp| {
            names.push(fp.name.clone());
            reporter.report(Stage::Sampling, fp.fraction() * 100.0);
        })?;
        drop(clip);
        let frames = match sampled {
            BatchOutcome::Completed { frames } => frames,
            BatchOutcome::Cancelled { frames_written } => {
                return Ok(JobOutcome::Cancelled { frames_written });
            }
        };
        reporter.report(Stage::Sampling, 100.0);

        reporter.report(Stage::Converting, 0.0);
        let converted = match self.converter.as_mut() {
            Some(conv) => {
                info!(converter = conv.name(), frames, "converting frames");
                let req = ConvertRequest {
                    frames_dir: &self.out_dir,
                    frame_names: &names,
                    fps: self.opts.fps,
                    size,
                    format: self.opts.format,
                };
                conv.convert(&req, cancel, &mut |p| {
                    reporter.report(Stage::Converting, p);
                })?;
                if cancel.is_cancelled() {
                    info!("export cancelled during conversion");
                    return Ok(JobOutcome::Cancelled {
                        frames_written: frames,
                    });
                }
                true
            }
            None => false,
        };
        reporter.report(Stage::Converting, 100.0);

        reporter.report(Stage::Cleanup, 0.0);
        if converted && !self.keep_frames {
            remove_frames(&self.out_dir, &names);
        }
        reporter.report(Stage::Cleanup, 100.0);

        reporter.report(Stage::Completed, 100.0);
        info!(frames, converted, "export job complete");
        Ok(JobOutcome::Completed { frames, converted })
    }
}

struct Reporter<'a> {
    composer: ProgressComposer,
    sink: &'a mut dyn FnMut(&StageProgress),
}

impl Reporter<'_> {
    fn report(&mut self, stage: Stage, pct: f64) {
        let ev = self.composer.report(stage, pct);
        if catch_unwind(AssertUnwindSafe(|| (self.sink)(&ev))).is_err() {
            warn!(stage = ?ev.stage, "progress callback panicked; continuing export");
        }
    }
}

/// Delete the frames this job wrote, then the directory if nothing else is left in it.
fn remove_frames(dir: &Path, names: &[String]) {
    let mut removed = 0usize;
    for name in names {
        match std::fs::remove_file(dir.join(name)) {
            Ok(()) => removed += 1,
            Err(e) => warn!(file = %name, error = %e, "failed to remove frame"),
        }
    }
    if let Err(e) = std::fs::remove_dir(dir) {
        debug!(dir = %dir.display(), error = %e, "frame directory kept");
    }
    debug!(removed, "frames cleaned up");
}

#[cfg(test)]
#[path = "../../tests/unit/progress/job.rs"]
mod tests;
