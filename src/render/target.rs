use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::core::PixelSize;
use crate::foundation::error::VanimResult;
use crate::render::surface::Surface;

/// Host-owned surface that interactive playback draws into.
///
/// The playback thread asks for the current size before each render and hands over the finished
/// frame with [`RenderTarget::present`]. Implementations marshal the frame to their own context.
pub trait RenderTarget: Send {
    /// Current surface size. An empty size skips rasterization for this pass.
    fn surface_size(&self) -> PixelSize;
    /// Receive a rendered frame.
    fn present(&mut self, frame: &Surface) -> VanimResult<()>;
}

/// Latest-frame slot shared between the playback thread and a headless host.
#[derive(Clone, Debug)]
pub struct FrameSlot {
    size: PixelSize,
    inner: Arc<Mutex<SlotInner>>,
}

#[derive(Debug, Default)]
struct SlotInner {
    latest: Option<Surface>,
    presented: u64,
}

impl FrameSlot {
    /// Create a slot that requests frames of `size`.
    pub fn new(size: PixelSize) -> Self {
        Self {
            size,
            inner: Arc::new(Mutex::new(SlotInner::default())),
        }
    }

    /// Clone of the most recently presented frame.
    pub fn latest(&self) -> Option<Surface> {
        self.inner.lock().latest.clone()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.inner.lock().presented
    }
}

impl RenderTarget for FrameSlot {
    fn surface_size(&self) -> PixelSize {
        self.size
    }

    fn present(&mut self, frame: &Surface) -> VanimResult<()> {
        let mut inner = self.inner.lock();
        inner.latest = Some(frame.clone());
        inner.presented += 1;
        Ok(())
    }
}
