use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{VanimError, VanimResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

/// Largest side accepted for an offscreen surface.
pub const MAX_SURFACE_DIM: u32 = 16_384;

/// Raster target for one frame: premultiplied RGBA8, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes.
    pub data: Vec<u8>,
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(size: PixelSize) -> VanimResult<Self> {
        if size.is_empty() {
            return Err(VanimError::validation(format!(
                "surface size must be non-zero, got {}x{}",
                size.width, size.height
            )));
        }
        if size.width > MAX_SURFACE_DIM || size.height > MAX_SURFACE_DIM {
            return Err(VanimError::validation(format!(
                "surface size too large: {}x{} (max {MAX_SURFACE_DIM}x{MAX_SURFACE_DIM})",
                size.width, size.height
            )));
        }
        let len = (size.width as usize) * (size.height as usize) * 4;
        Ok(Self {
            width: size.width,
            height: size.height,
            data: vec![0; len],
        })
    }

    /// Wrap straight-alpha RGBA8 pixels.
    pub fn from_straight_rgba8(size: PixelSize, mut rgba: Vec<u8>) -> VanimResult<Self> {
        if rgba.len() != (size.width as usize) * (size.height as usize) * 4 {
            return Err(VanimError::validation(
                "rgba buffer length does not match width*height*4",
            ));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width: size.width,
            height: size.height,
            data: rgba,
        })
    }

    /// Surface dimensions.
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Premultiplied RGBA8 of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Borrow the pixels as a `tiny_skia` pixmap for rasterization.
    pub fn pixmap_mut(&mut self) -> VanimResult<resvg::tiny_skia::PixmapMut<'_>> {
        let (w, h) = (self.width, self.height);
        resvg::tiny_skia::PixmapMut::from_bytes(&mut self.data, w, h)
            .ok_or_else(|| VanimError::render(format!("invalid pixmap geometry {w}x{h}")))
    }

    /// Straight-alpha copy of the pixels, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }

    /// Encode and write the surface to `path`.
    pub fn save(&self, path: &Path, format: FrameFormat) -> VanimResult<()> {
        let rgba = self.to_straight_rgba8();
        image::save_buffer_with_format(
            path,
            &rgba,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            format.image_format(),
        )
        .with_context(|| format!("write frame image '{}'", path.display()))
        .map_err(|e| VanimError::encode(format!("{e:#}")))
    }
}

/// Image container used for exported frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// Lossless PNG with alpha.
    #[default]
    Png,
    /// Uncompressed BMP with alpha.
    Bmp,
}

impl FrameFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl std::str::FromStr for FrameFormat {
    type Err = VanimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Bmp),
            other => Err(VanimError::validation(format!(
                "unsupported frame format '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
