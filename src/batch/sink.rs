use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VanimError, VanimResult};
use crate::render::surface::{FrameFormat, Surface};

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Frames that will be pushed if the run is not cancelled.
    pub frame_count: u64,
}

/// Consumer of sampled frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order starting
/// at 0. `end` is only called when every frame was pushed.
pub trait FrameSink: Send {
    /// Called once before any frame is pushed.
    fn begin(&mut self, cfg: SinkConfig) -> VanimResult<()>;
    /// Consume one frame and return the name it was stored under.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Surface) -> VanimResult<String>;
    /// Called once after the last frame.
    fn end(&mut self) -> VanimResult<()>;
}

/// Zero-padded sequential file name, `00000.png`, `00001.png`, ...
pub fn frame_file_name(idx: FrameIndex, format: FrameFormat) -> String {
    format!("{:05}.{}", idx.0, format.extension())
}

/// Writes each frame as an image file in a directory.
///
/// Files already in the directory are overwritten, never deleted.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
    format: FrameFormat,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl ImageSequenceSink {
    /// Write frames into `dir` using `format`.
    pub fn new(dir: impl Into<PathBuf>, format: FrameFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            cfg: None,
            last_idx: None,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for ImageSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> VanimResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(VanimError::validation(
                "image sequence width/height must be non-zero",
            ));
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create frame directory '{}'", self.dir.display()))?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Surface) -> VanimResult<String> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VanimError::encode("image sequence sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(VanimError::encode(
                "image sequence sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(VanimError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.last_idx = Some(idx);

        let name = frame_file_name(idx, self.format);
        frame.save(&self.dir.join(&name), self.format)?;
        Ok(name)
    }

    fn end(&mut self) -> VanimResult<()> {
        self.cfg = None;
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Surface)>,
    ended: bool,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, Surface)] {
        &self.frames
    }

    /// Whether `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> VanimResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Surface) -> VanimResult<String> {
        self.frames.push((idx, frame.clone()));
        Ok(format!("{:05}", idx.0))
    }

    fn end(&mut self) -> VanimResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/sink.rs"]
mod tests;
