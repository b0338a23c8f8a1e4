//! The page being captured: geometry, scrolling and element lookup.

use std::sync::Arc;

use crate::util::Rect;

/// Page geometry read before a full-page capture. Heights and widths are CSS
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub scroll_height: u32,
    pub client_height: u32,
    pub offset_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Device pixels per CSS pixel.
    pub device_pixel_ratio: f64,
}

impl PageMetrics {
    /// The document height as the largest of the reported heights.
    pub fn total_height(&self) -> u32 {
        self.scroll_height
            .max(self.client_height)
            .max(self.offset_height)
    }

    /// Number of viewport-sized steps needed to cover the document.
    pub fn segment_count(&self) -> u32 {
        if self.viewport_height == 0 {
            return 0;
        }
        self.total_height().div_ceil(self.viewport_height)
    }
}

/// Access to the live page.
///
/// Offsets are CSS pixels from the top of the document. `scroll_to` may clamp
/// near the bottom, so callers read `scroll_offset` back after scrolling.
pub trait PageSurface: Send + Sync {
    fn metrics(&self) -> PageMetrics;

    fn scroll_offset(&self) -> u32;

    fn scroll_to(&self, offset: u32);

    /// Viewport-relative client rect of the first element matching `selector`.
    fn element_rect(&self, selector: &str) -> Option<Rect>;
}

/// Restores the page's scroll position when dropped, on every exit path.
pub struct ScrollGuard {
    page: Arc<dyn PageSurface>,
    origin: u32,
}

impl ScrollGuard {
    pub fn new(page: Arc<dyn PageSurface>) -> Self {
        let origin = page.scroll_offset();
        Self { page, origin }
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        log::debug!("Restoring scroll position to {}", self.origin);
        self.page.scroll_to(self.origin);
    }
}
