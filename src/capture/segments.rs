//! Full-page capture by scrolling the viewport one screen at a time.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use image::imageops;
use tokio_util::sync::CancellationToken;

use super::compositor::{MergeJob, MergeMessage, Segment, spawn_merge};
use super::page::{PageMetrics, PageSurface, ScrollGuard};
use super::transport::CaptureTransport;
use super::types::CaptureError;
use crate::draw::raster;

/// Segments of one full-page capture, ready for the compositor.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    pub segments: Vec<Segment>,
    /// Output width in device pixels.
    pub width: u32,
    /// Output height in device pixels.
    pub total_height: u32,
}

/// Merged full-page image as a PNG data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

fn to_device(css: u32, dpr: f64) -> u32 {
    (f64::from(css) * dpr).round() as u32
}

/// Drives the page through successive scroll positions and collects one
/// cropped viewport capture per position.
pub struct SegmentCapturer {
    page: Arc<dyn PageSurface>,
    transport: Arc<dyn CaptureTransport>,
    settle: Duration,
}

impl SegmentCapturer {
    pub fn new(
        page: Arc<dyn PageSurface>,
        transport: Arc<dyn CaptureTransport>,
        settle: Duration,
    ) -> Self {
        Self {
            page,
            transport,
            settle,
        }
    }

    /// Captures every viewport-sized step of the page, aborting on the first
    /// failure. The original scroll position is restored on every exit path.
    pub async fn capture_segments(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SegmentPlan, CaptureError> {
        let metrics = self.page.metrics();
        validate_metrics(&metrics)?;

        let _restore = ScrollGuard::new(self.page.clone());

        let total_css = metrics.total_height();
        let count = metrics.segment_count();
        let dpr = metrics.device_pixel_ratio;
        let width = to_device(metrics.viewport_width, dpr);
        let total_height = to_device(total_css, dpr);
        log::info!(
            "Capturing full page: {}px tall in {} segments (dpr {})",
            total_css,
            count,
            dpr
        );

        let mut segments = Vec::with_capacity(count as usize);
        for index in 0..count {
            let target = index * metrics.viewport_height;
            self.page.scroll_to(target);
            self.settle(cancel).await?;

            let actual = self.page.scroll_offset();
            let image = self.capture_viewport(cancel).await?;

            let segment_top = to_device(target, dpr);
            let segment_bottom = to_device((target + metrics.viewport_height).min(total_css), dpr);
            // When the last scroll is clamped, the viewport sits higher than
            // requested and the wanted rows start further down the capture.
            let crop_top = segment_top.saturating_sub(to_device(actual, dpr));
            let crop = crop_segment(image, width, crop_top, segment_bottom - segment_top)?;

            log::debug!(
                "Segment {}/{}: target {} actual {} rows {}..{}",
                index + 1,
                count,
                target,
                actual,
                segment_top,
                segment_bottom
            );
            segments.push(Segment::new(crop, segment_top));
        }

        Ok(SegmentPlan {
            segments,
            width,
            total_height,
        })
    }

    /// Captures all segments and merges them off the async workers.
    pub async fn capture_full_page(
        &self,
        runtime_handle: &tokio::runtime::Handle,
        cancel: &CancellationToken,
    ) -> Result<MergedPage, CaptureError> {
        let plan = self.capture_segments(cancel).await?;
        let (width, height) = (plan.width, plan.total_height);
        let job = MergeJob {
            segments: plan.segments,
            width,
            total_height: height,
        };

        let reply = tokio::select! {
            reply = spawn_merge(runtime_handle, job) => reply,
            _ = cancel.cancelled() => {
                return Err(CaptureError::Cancelled("cancelled during merge".to_string()));
            }
        };
        match reply {
            Ok(MergeMessage::MergeComplete { data_url }) => Ok(MergedPage {
                data_url,
                width,
                height,
            }),
            Ok(MergeMessage::MergeFailed { error }) => Err(CaptureError::Geometry(error)),
            Err(_) => Err(CaptureError::Geometry("merge worker stopped".to_string())),
        }
    }

    async fn settle(&self, cancel: &CancellationToken) -> Result<(), CaptureError> {
        tokio::select! {
            _ = tokio::time::sleep(self.settle) => Ok(()),
            _ = cancel.cancelled() => {
                Err(CaptureError::Cancelled("cancelled while scrolling".to_string()))
            }
        }
    }

    async fn capture_viewport(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, CaptureError> {
        let bytes = tokio::select! {
            result = self.transport.request_capture() => result.into_image()?,
            _ = cancel.cancelled() => {
                return Err(CaptureError::Cancelled("cancelled during capture".to_string()));
            }
        };
        raster::decode(&bytes).map_err(|e| CaptureError::Decode(e.to_string()))
    }
}

fn validate_metrics(metrics: &PageMetrics) -> Result<(), CaptureError> {
    if metrics.viewport_height == 0 || metrics.viewport_width == 0 {
        return Err(CaptureError::Geometry(format!(
            "viewport is {}x{}",
            metrics.viewport_width, metrics.viewport_height
        )));
    }
    if !(metrics.device_pixel_ratio.is_finite() && metrics.device_pixel_ratio > 0.0) {
        return Err(CaptureError::Geometry(format!(
            "device pixel ratio {} is not positive",
            metrics.device_pixel_ratio
        )));
    }
    if metrics.total_height() == 0 {
        return Err(CaptureError::Geometry("page has no height".to_string()));
    }
    Ok(())
}

/// Cuts `height` rows starting at `top` out of a viewport capture.
///
/// Fractional device pixel ratios can make the wanted band one row taller than
/// what the capture holds; that row is filled by repeating the last one.
fn crop_segment(
    image: RgbaImage,
    width: u32,
    top: u32,
    height: u32,
) -> Result<RgbaImage, CaptureError> {
    let available = image.height().saturating_sub(top).min(height);
    if image.width() != width || available == 0 || height - available > 1 {
        return Err(CaptureError::Geometry(format!(
            "capture is {}x{}, need rows {}..{} at width {}",
            image.width(),
            image.height(),
            top,
            top + height,
            width
        )));
    }
    if top == 0 && height == image.height() {
        return Ok(image);
    }

    let mut band = RgbaImage::new(width, height);
    let rows = imageops::crop_imm(&image, 0, top, width, available).to_image();
    imageops::replace(&mut band, &rows, 0, 0);
    for y in available..height {
        for x in 0..width {
            let pixel = *band.get_pixel(x, available - 1);
            band.put_pixel(x, y, pixel);
        }
    }
    Ok(band)
}
