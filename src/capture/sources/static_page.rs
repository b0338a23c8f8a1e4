use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::capture::page::{PageMetrics, PageSurface};
use crate::capture::transport::VisibleSurface;
use crate::capture::types::CaptureError;
use crate::draw::raster;
use crate::util::Rect;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn to_device(css: u32, dpr: f64) -> u32 {
    (f64::from(css) * dpr).round() as u32
}

/// A page backed by a pre-rendered image of the whole document.
///
/// The image is in device pixels. Scrolling behaves like a browser: offsets
/// clamp at the bottom of the document, and area past the document paints
/// as white.
pub struct StaticPage {
    document: RgbaImage,
    viewport_width: u32,
    viewport_height: u32,
    device_pixel_ratio: f64,
    scroll: AtomicU32,
    elements: HashMap<String, Rect>,
}

impl StaticPage {
    /// `viewport_height` is in CSS pixels; the viewport is as wide as the
    /// document.
    pub fn new(document: RgbaImage, viewport_height: u32, device_pixel_ratio: f64) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let viewport_width = (f64::from(document.width()) / device_pixel_ratio).round() as u32;
        Self {
            document,
            viewport_width,
            viewport_height,
            device_pixel_ratio,
            scroll: AtomicU32::new(0),
            elements: HashMap::new(),
        }
    }

    pub fn from_file(
        path: &Path,
        viewport_height: u32,
        device_pixel_ratio: f64,
    ) -> Result<Self, CaptureError> {
        let bytes = std::fs::read(path)?;
        let document = raster::decode(&bytes)
            .map_err(|e| CaptureError::Decode(format!("{}: {}", path.display(), e)))?;
        log::debug!(
            "Loaded page image {} ({}x{})",
            path.display(),
            document.width(),
            document.height()
        );
        Ok(Self::new(document, viewport_height, device_pixel_ratio))
    }

    /// Registers an element at `rect`, given in document CSS pixels.
    pub fn with_element(mut self, selector: impl Into<String>, rect: Rect) -> Self {
        self.elements.insert(selector.into(), rect);
        self
    }

    fn document_height(&self) -> u32 {
        (f64::from(self.document.height()) / self.device_pixel_ratio).round() as u32
    }

    fn max_scroll(&self) -> u32 {
        self.document_height().saturating_sub(self.viewport_height)
    }
}

impl PageSurface for StaticPage {
    fn metrics(&self) -> PageMetrics {
        let height = self.document_height();
        PageMetrics {
            scroll_height: height,
            client_height: self.viewport_height.min(height),
            offset_height: height,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            device_pixel_ratio: self.device_pixel_ratio,
        }
    }

    fn scroll_offset(&self) -> u32 {
        self.scroll.load(Ordering::SeqCst)
    }

    fn scroll_to(&self, offset: u32) {
        self.scroll
            .store(offset.min(self.max_scroll()), Ordering::SeqCst);
    }

    fn element_rect(&self, selector: &str) -> Option<Rect> {
        let rect = self.elements.get(selector)?;
        Some(Rect {
            y: rect.y - self.scroll_offset() as i32,
            ..*rect
        })
    }
}

#[async_trait]
impl VisibleSurface for StaticPage {
    async fn capture_visible(&self) -> Result<RgbaImage, CaptureError> {
        let dpr = self.device_pixel_ratio;
        let width = to_device(self.viewport_width, dpr);
        let height = to_device(self.viewport_height, dpr);
        if width == 0 || height == 0 {
            return Err(CaptureError::TransportFailed(
                "viewport has no visible area".to_string(),
            ));
        }

        let top = to_device(self.scroll_offset(), dpr);
        let mut visible = RgbaImage::from_pixel(width, height, BACKGROUND);
        for y in 0..height {
            let source_y = top + y;
            if source_y >= self.document.height() {
                break;
            }
            for x in 0..width.min(self.document.width()) {
                visible.put_pixel(x, y, *self.document.get_pixel(x, source_y));
            }
        }
        Ok(visible)
    }
}
