use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clip::AnimationClip;
use crate::clip::svg_load::SvgLoader;
use crate::foundation::core::{Fps, PixelSize, Rect};
use crate::foundation::error::{VanimError, VanimResult};
use crate::render::surface::Surface;

/// Frame rate assumed for keyframe directories and single SVG files.
pub const DEFAULT_SEQUENCE_FPS: Fps = Fps { num: 30, den: 1 };

/// Vector animation stored as SVG keyframes shown at a fixed rate.
///
/// Keyframe `i` covers `[i / fps, (i + 1) / fps)`; the last keyframe also covers the end of the
/// clip.
pub struct SvgSequenceClip {
    fps: Fps,
    frames: Vec<Arc<usvg::Tree>>,
    natural: PixelSize,
}

/// On-disk manifest describing an SVG keyframe sequence.
///
/// ```json
/// { "fps": 30, "frames": ["f000.svg", "f001.svg"], "width": 512, "height": 512 }
/// ```
///
/// Frame paths are relative to the manifest. `width`/`height` override the size taken from the
/// first keyframe.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipManifest {
    /// Keyframe rate, as a number (`30`) or a rational string (`"30000/1001"`).
    #[serde(default = "default_manifest_fps")]
    pub fps: FpsDef,
    /// Keyframe SVG files in display order.
    pub frames: Vec<PathBuf>,
    /// Natural width override.
    #[serde(default)]
    pub width: Option<u32>,
    /// Natural height override.
    #[serde(default)]
    pub height: Option<u32>,
}

/// Frame rate as written in a manifest.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum FpsDef {
    /// Integral frames per second.
    Int(u32),
    /// `"num"` or `"num/den"`.
    Text(String),
}

impl FpsDef {
    fn resolve(&self) -> VanimResult<Fps> {
        match self {
            Self::Int(n) => Fps::new(*n, 1),
            Self::Text(s) => s.parse(),
        }
    }
}

fn default_manifest_fps() -> FpsDef {
    FpsDef::Int(DEFAULT_SEQUENCE_FPS.num)
}

impl SvgSequenceClip {
    /// Build a clip from parsed keyframes.
    pub fn from_trees(fps: Fps, frames: Vec<Arc<usvg::Tree>>) -> VanimResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| VanimError::decode("svg sequence has no frames"))?;
        let natural = tree_pixel_size(first)?;
        Ok(Self {
            fps,
            frames,
            natural,
        })
    }

    /// Parse every keyframe from SVG bytes. Text uses the system fonts; relative `href`s do
    /// not resolve.
    pub fn from_svg_data<B: AsRef<[u8]>>(fps: Fps, frames: &[B]) -> VanimResult<Self> {
        let loader = SvgLoader::new(None);
        let trees = frames
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                loader
                    .parse(bytes.as_ref(), None)
                    .map_err(|e| VanimError::decode(format!("svg keyframe {i}: {e}")))
            })
            .collect::<VanimResult<Vec<_>>>()?;
        Self::from_trees(fps, trees)
    }

    /// Override the natural size reported to hosts.
    pub fn with_natural_size(mut self, size: PixelSize) -> Self {
        self.natural = size;
        self
    }

    /// Open a manifest, a keyframe directory, or a single SVG file.
    pub fn open(path: &Path) -> VanimResult<Self> {
        if path.is_dir() {
            return Self::from_dir(path, DEFAULT_SEQUENCE_FPS);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => {
                let loader = SvgLoader::new(path.parent());
                let tree = loader.read(path)?;
                Self::from_trees(DEFAULT_SEQUENCE_FPS, vec![tree])
            }
            _ => Self::from_manifest_path(path),
        }
    }

    /// Load a [`ClipManifest`] from disk.
    pub fn from_manifest_path(path: &Path) -> VanimResult<Self> {
        let f = File::open(path).map_err(|e| {
            VanimError::decode(format!("open clip manifest '{}': {e}", path.display()))
        })?;
        let manifest: ClipManifest = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            VanimError::decode(format!("parse clip manifest '{}': {e}", path.display()))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(&manifest, base)
    }

    /// Load the keyframes listed in `manifest`, resolving paths against `base`.
    pub fn from_manifest(manifest: &ClipManifest, base: &Path) -> VanimResult<Self> {
        let fps = manifest
            .fps
            .resolve()
            .map_err(|e| VanimError::decode(format!("clip manifest fps: {e}")))?;
        let loader = SvgLoader::new(Some(base));
        let trees = manifest
            .frames
            .iter()
            .map(|rel| loader.read(&base.join(rel)))
            .collect::<VanimResult<Vec<_>>>()?;
        let mut clip = Self::from_trees(fps, trees)?;
        if manifest.width.is_some() || manifest.height.is_some() {
            let size = PixelSize::new(
                manifest.width.unwrap_or(clip.natural.width),
                manifest.height.unwrap_or(clip.natural.height),
            );
            clip = clip.with_natural_size(size);
        }
        Ok(clip)
    }

    /// Load every `*.svg` file in `dir`, sorted by file name.
    pub fn from_dir(dir: &Path, fps: Fps) -> VanimResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            VanimError::decode(format!("read keyframe dir '{}': {e}", dir.display()))
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                VanimError::decode(format!("read keyframe dir '{}': {e}", dir.display()))
            })?;
            let p = entry.path();
            if p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
            {
                paths.push(p);
            }
        }
        paths.sort();
        tracing::debug!(dir = %dir.display(), frames = paths.len(), "loading svg keyframes");
        let loader = SvgLoader::new(Some(dir));
        let trees = paths
            .iter()
            .map(|p| loader.read(p))
            .collect::<VanimResult<Vec<_>>>()?;
        Self::from_trees(fps, trees)
    }

    /// Keyframe rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Number of keyframes.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Keyframe shown at `time_secs`.
    pub fn frame_at(&self, time_secs: f64) -> usize {
        let last = self.frames.len().saturating_sub(1);
        if !time_secs.is_finite() || time_secs <= 0.0 {
            return 0;
        }
        // Tolerate float noise so that `k / fps` lands on keyframe `k`.
        let idx = (time_secs * self.fps.as_f64() + 1e-9).floor();
        (idx as usize).min(last)
    }
}

impl AnimationClip for SvgSequenceClip {
    fn duration_secs(&self) -> f64 {
        (self.frames.len() as f64) * self.fps.frame_duration_secs()
    }

    fn natural_size(&self) -> PixelSize {
        self.natural
    }

    fn seek_and_render(
        &mut self,
        time_secs: f64,
        target: &mut Surface,
        dest: Rect,
    ) -> VanimResult<()> {
        let tree = &self.frames[self.frame_at(time_secs)];
        let size = tree.size();
        let sx = (dest.width() as f32) / size.width();
        let sy = (dest.height() as f32) / size.height();
        if !sx.is_finite() || !sy.is_finite() || sx <= 0.0 || sy <= 0.0 {
            return Ok(());
        }
        let xform =
            resvg::tiny_skia::Transform::from_row(sx, 0.0, 0.0, sy, dest.x0 as f32, dest.y0 as f32);
        let mut pixmap = target.pixmap_mut()?;
        resvg::render(tree, xform, &mut pixmap);
        Ok(())
    }
}

fn tree_pixel_size(tree: &usvg::Tree) -> VanimResult<PixelSize> {
    fn to_px(v: f32) -> VanimResult<u32> {
        if !v.is_finite() || v <= 0.0 {
            return Err(VanimError::decode("svg has invalid width/height"));
        }
        Ok((v.ceil() as u32).max(1))
    }
    let size = tree.size();
    Ok(PixelSize::new(to_px(size.width())?, to_px(size.height())?))
}

#[cfg(test)]
#[path = "../../tests/unit/clip/svg_sequence.rs"]
mod tests;
