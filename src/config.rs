//! JSON configuration files for the player and the exporter.
//!
//! Every field except the clip source has a default, so a minimal file is
//! `{ "source": "clip.json" }`. Command-line flags override file values.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::batch::sampler::BatchOpts;
use crate::foundation::core::{
    FillMode, Fps, LoopTarget, StretchDirection, validate_sample_rate, validate_speed,
};
use crate::foundation::error::{VanimError, VanimResult};
use crate::playback::command::StartParams;
use crate::render::surface::FrameFormat;

/// Interactive playback settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Clip manifest, keyframe directory or SVG file.
    pub source: PathBuf,
    /// Scaling mode.
    #[serde(default)]
    pub fill: FillMode,
    /// Scaling restriction.
    #[serde(default)]
    pub stretch: StretchDirection,
    /// Loops before freezing; a number or `"infinite"`.
    #[serde(default)]
    pub loop_target: LoopTarget,
    /// Playback speed multiplier.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Redraw cap in Hz, `0` for uncapped.
    #[serde(default)]
    pub sample_rate_hz: f64,
}

impl PlayerConfig {
    /// Defaults for `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            fill: FillMode::default(),
            stretch: StretchDirection::default(),
            loop_target: LoopTarget::default(),
            speed: default_speed(),
            sample_rate_hz: 0.0,
        }
    }

    /// Parse from a JSON reader and validate.
    pub fn from_reader<R: std::io::Read>(r: R) -> VanimResult<Self> {
        let cfg: Self = parse_json(r, "player config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse from a JSON file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> VanimResult<Self> {
        Self::from_reader(open_json(path.as_ref(), "player config")?)
    }

    /// Check speed and sample rate.
    pub fn validate(&self) -> VanimResult<()> {
        validate_speed(self.speed)?;
        validate_sample_rate(self.sample_rate_hz)?;
        Ok(())
    }

    /// Parameters for a `Start` command.
    pub fn start_params(&self) -> StartParams {
        StartParams {
            fill: self.fill,
            direction: self.stretch,
            loop_target: self.loop_target,
            speed: self.speed,
            sample_rate_hz: self.sample_rate_hz,
        }
    }
}

/// Offline export settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Clip manifest, keyframe directory or SVG file.
    pub source: PathBuf,
    /// Directory receiving the frame files.
    pub out_dir: PathBuf,
    /// Output frame rate as `{ "num": 30, "den": 1 }`.
    #[serde(default = "default_fps")]
    pub fps: Fps,
    /// Animation seconds per output second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Output width.
    #[serde(default)]
    pub width: Option<u32>,
    /// Output height.
    #[serde(default)]
    pub height: Option<u32>,
    /// Frame image format.
    #[serde(default)]
    pub format: FrameFormat,
    /// Keep frame files after a converter consumed them.
    #[serde(default = "default_keep_frames")]
    pub keep_frames: bool,
}

impl ExportConfig {
    /// Defaults for `source` exported into `out_dir`.
    pub fn new(source: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            out_dir: out_dir.into(),
            fps: default_fps(),
            speed: default_speed(),
            width: None,
            height: None,
            format: FrameFormat::default(),
            keep_frames: default_keep_frames(),
        }
    }

    /// Parse from a JSON reader and validate.
    pub fn from_reader<R: std::io::Read>(r: R) -> VanimResult<Self> {
        let cfg: Self = parse_json(r, "export config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse from a JSON file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> VanimResult<Self> {
        Self::from_reader(open_json(path.as_ref(), "export config")?)
    }

    /// Reject non-positive fps/speed and zero dimensions.
    pub fn validate(&self) -> VanimResult<()> {
        self.batch_opts().validate()
    }

    /// Sampling options for the batch path.
    pub fn batch_opts(&self) -> BatchOpts {
        BatchOpts {
            fps: self.fps,
            speed: self.speed,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

fn default_speed() -> f64 {
    1.0
}

fn default_fps() -> Fps {
    Fps { num: 30, den: 1 }
}

fn default_keep_frames() -> bool {
    true
}

fn open_json(path: &Path, what: &str) -> VanimResult<BufReader<File>> {
    let f = File::open(path)
        .map_err(|e| VanimError::validation(format!("open {what} '{}': {e}", path.display())))?;
    Ok(BufReader::new(f))
}

fn parse_json<T: DeserializeOwned, R: std::io::Read>(r: R, what: &str) -> VanimResult<T> {
    serde_json::from_reader(r).map_err(|e| VanimError::validation(format!("parse {what}: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
