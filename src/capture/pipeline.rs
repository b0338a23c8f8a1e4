use std::{sync::Arc, time::Duration};

use image::{RgbaImage, imageops};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::capture::{
    dataurl::DataUrl,
    dependencies::CaptureDependencies,
    message::ExtensionMessage,
    segments::SegmentCapturer,
    types::{CaptureError, CaptureMode, CaptureRequest, CaptureSettings, CaptureStatus, CapturedImage},
};
use crate::draw::raster;
use crate::util::Rect;

/// Everything a single capture run needs besides the request itself.
pub(crate) struct PipelineContext {
    pub(crate) dependencies: Arc<CaptureDependencies>,
    pub(crate) settings: CaptureSettings,
    pub(crate) runtime_handle: tokio::runtime::Handle,
    pub(crate) status: Arc<Mutex<CaptureStatus>>,
    pub(crate) cancel: CancellationToken,
}

pub(crate) async fn perform_capture(
    request: CaptureRequest,
    ctx: &PipelineContext,
) -> Result<CapturedImage, CaptureError> {
    log::info!("Starting capture: {:?}", request.mode);

    if !request.delay.is_zero() {
        *ctx.status.lock().await = CaptureStatus::CountingDown;
        countdown(request.delay, &ctx.cancel).await?;
    }

    let deps = &ctx.dependencies;
    let (data_url, width, height) = match &request.mode {
        CaptureMode::Viewport => {
            *ctx.status.lock().await = CaptureStatus::InProgress;
            let image = capture_viewport(ctx).await?;
            encode(&image)?
        }
        CaptureMode::FullPage => {
            *ctx.status.lock().await = CaptureStatus::InProgress;
            let capturer = SegmentCapturer::new(
                deps.page.clone(),
                deps.transport.clone(),
                ctx.settings.settle,
            );
            let merged = capturer
                .capture_full_page(&ctx.runtime_handle, &ctx.cancel)
                .await?;
            (merged.data_url, merged.width, merged.height)
        }
        CaptureMode::Selection => {
            *ctx.status.lock().await = CaptureStatus::AwaitingSelection;
            let selected = tokio::select! {
                selected = deps.selection.select(ctx.settings.min_selection) => selected?,
                _ = ctx.cancel.cancelled() => {
                    return Err(CaptureError::Cancelled("cancelled during selection".to_string()));
                }
            };
            let rect = selected
                .ok_or_else(|| CaptureError::Cancelled("selection abandoned".to_string()))?;
            log::info!("Selected region {:?}", rect);

            *ctx.status.lock().await = CaptureStatus::InProgress;
            let image = capture_viewport(ctx).await?;
            let dpr = deps.page.metrics().device_pixel_ratio;
            encode(&crop_region(&image, rect, dpr)?)?
        }
        CaptureMode::Element { selector } => {
            *ctx.status.lock().await = CaptureStatus::InProgress;
            let rect = deps
                .page
                .element_rect(selector)
                .ok_or_else(|| CaptureError::ElementNotFound(selector.clone()))?;
            log::info!("Element '{}' at {:?}", selector, rect);

            let image = capture_viewport(ctx).await?;
            let dpr = deps.page.metrics().device_pixel_ratio;
            encode(&crop_region(&image, rect, dpr)?)?
        }
    };

    log::info!("Captured {}x{} image ({:?})", width, height, request.mode);

    let handoff = ExtensionMessage::OpenEditor {
        data_url: data_url.clone(),
    };
    let editor = Arc::clone(&deps.editor);
    tokio::task::spawn_blocking(move || editor.open_editor(&handoff))
        .await
        .map_err(|e| CaptureError::EditorHandoff(format!("Editor task failed: {}", e)))??;

    Ok(CapturedImage {
        mode: request.mode,
        data_url,
        width,
        height,
    })
}

/// Waits out `delay`, logging each remaining second.
async fn countdown(delay: Duration, cancel: &CancellationToken) -> Result<(), CaptureError> {
    let mut remaining = delay;
    while !remaining.is_zero() {
        log::info!("Capturing in {}...", remaining.as_secs_f64().ceil() as u64);
        let step = remaining.min(Duration::from_secs(1));
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = cancel.cancelled() => {
                return Err(CaptureError::Cancelled("cancelled during countdown".to_string()));
            }
        }
        remaining -= step;
    }
    Ok(())
}

async fn capture_viewport(ctx: &PipelineContext) -> Result<RgbaImage, CaptureError> {
    let bytes = tokio::select! {
        result = ctx.dependencies.transport.request_capture() => result.into_image()?,
        _ = ctx.cancel.cancelled() => {
            return Err(CaptureError::Cancelled("cancelled during capture".to_string()));
        }
    };
    log::debug!("Obtained viewport capture ({} bytes)", bytes.len());
    raster::decode(&bytes).map_err(|e| CaptureError::Decode(e.to_string()))
}

fn encode(image: &RgbaImage) -> Result<(String, u32, u32), CaptureError> {
    let png = raster::encode_png(image).map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok((
        DataUrl::png(png).to_string(),
        image.width(),
        image.height(),
    ))
}

/// Crops a viewport-relative CSS rectangle out of a device-resolution capture.
///
/// The part of `rect` outside the viewport is dropped; a rectangle entirely
/// outside is an error.
pub(crate) fn crop_region(image: &RgbaImage, rect: Rect, dpr: f64) -> Result<RgbaImage, CaptureError> {
    let device = rect
        .scale(dpr)
        .and_then(|r| r.clip_to(image.width(), image.height()))
        .ok_or_else(|| {
            CaptureError::Geometry(format!(
                "region {:?} lies outside the {}x{} capture",
                rect,
                image.width(),
                image.height()
            ))
        })?;

    Ok(imageops::crop_imm(
        image,
        device.x as u32,
        device.y as u32,
        device.width as u32,
        device.height as u32,
    )
    .to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn crop_region_scales_by_device_pixel_ratio() {
        let image = RgbaImage::from_fn(200, 100, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let cropped = crop_region(&image, Rect::new(10, 5, 20, 10).unwrap(), 2.0).unwrap();
        assert_eq!(cropped.dimensions(), (40, 20));
        assert_eq!(cropped.get_pixel(0, 0), &Rgba([20, 10, 0, 255]));
    }

    #[test]
    fn crop_region_clips_to_viewport() {
        let image = RgbaImage::new(100, 100);
        let cropped = crop_region(&image, Rect::new(80, -10, 50, 30).unwrap(), 1.0).unwrap();
        assert_eq!(cropped.dimensions(), (20, 20));
        assert!(crop_region(&image, Rect::new(0, 150, 10, 10).unwrap(), 1.0).is_err());
    }

    #[test]
    fn encode_failure_is_not_reported_as_decode() {
        let err = encode(&RgbaImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, CaptureError::Encode(_)), "unexpected error: {err:?}");
        assert!(err.to_string().contains("encoded"));
    }

    #[test]
    fn encode_returns_png_data_url_and_size() {
        let (url, width, height) = encode(&RgbaImage::new(3, 2)).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!((width, height), (3, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_waits_full_delay() {
        let started = tokio::time::Instant::now();
        countdown(Duration::from_millis(2500), &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2500));
        assert!(elapsed < Duration::from_millis(2600));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_on_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            countdown(Duration::from_secs(3), &token).await,
            Err(CaptureError::Cancelled(_))
        ));
    }
}
