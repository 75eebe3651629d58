//! Decoded vector animation clips.
//!
//! Playback and batch export only see the [`AnimationClip`] trait: a duration, a natural size and
//! a way to draw the clip at a given time. Releasing a clip is dropping it.

/// Keyframe parsing with a shared font database.
pub mod svg_load;
/// SVG keyframe sequences rendered with `resvg`.
pub mod svg_sequence;

use std::path::Path;

use crate::foundation::core::{PixelSize, Rect};
use crate::foundation::error::{VanimError, VanimResult};
use crate::render::surface::Surface;

/// A decoded, resolution-independent animation.
pub trait AnimationClip: Send {
    /// Intrinsic, unscaled duration in seconds.
    fn duration_secs(&self) -> f64;

    /// Natural size in pixels.
    fn natural_size(&self) -> PixelSize;

    /// Draw the clip as it appears at `time_secs` into `dest` on `target`.
    ///
    /// `time_secs` is clamped to `[0, duration]` by implementations.
    fn seek_and_render(&mut self, time_secs: f64, target: &mut Surface, dest: Rect)
    -> VanimResult<()>;
}

/// Summary of a clip, as printed by `vanim info`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ClipInfo {
    /// Intrinsic duration in seconds.
    pub duration_secs: f64,
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
}

impl ClipInfo {
    /// Capture the summary of `clip`.
    pub fn of(clip: &dyn AnimationClip) -> Self {
        let size = clip.natural_size();
        Self {
            duration_secs: clip.duration_secs(),
            width: size.width,
            height: size.height,
        }
    }
}

/// Check the resource contract: a finite positive duration and a non-empty natural size.
pub fn validate_clip(clip: &dyn AnimationClip) -> VanimResult<()> {
    let d = clip.duration_secs();
    if !d.is_finite() || d <= 0.0 {
        return Err(VanimError::decode(format!(
            "clip duration must be finite and > 0, got {d}"
        )));
    }
    let size = clip.natural_size();
    if size.is_empty() {
        return Err(VanimError::decode(format!(
            "clip natural size must be non-zero, got {}x{}",
            size.width, size.height
        )));
    }
    Ok(())
}

/// Open and validate a clip from disk.
///
/// Accepts a JSON manifest, a directory of `*.svg` keyframes, or a single `.svg` file.
pub fn open_clip(path: impl AsRef<Path>) -> VanimResult<Box<dyn AnimationClip>> {
    let clip = svg_sequence::SvgSequenceClip::open(path.as_ref())?;
    validate_clip(&clip)?;
    Ok(Box::new(clip))
}


#[cfg(test)]
#[path = "../../tests/unit/clip/mod.rs"]
mod tests;
