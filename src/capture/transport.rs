//! Request/response channel between the page-side capturer and the
//! privileged side that can read pixels of the visible area.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use tokio::sync::{Mutex, mpsc, oneshot};

use super::dataurl::DataUrl;
use super::message::{CaptureTabResponse, ExtensionMessage};
use super::types::CaptureError;
use crate::draw::raster;

/// Result of one visible-area capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    /// Encoded (PNG) image of the visible viewport at device resolution.
    Image(Vec<u8>),
    Error(String),
}

impl CaptureResult {
    pub fn into_image(self) -> Result<Vec<u8>, CaptureError> {
        match self {
            CaptureResult::Image(bytes) => Ok(bytes),
            CaptureResult::Error(message) => Err(CaptureError::TransportFailed(message)),
        }
    }
}

/// Something that can be asked for an image of the currently visible area.
#[async_trait]
pub trait CaptureTransport: Send + Sync {
    async fn request_capture(&self) -> CaptureResult;
}

/// The privileged end: produces raw pixels of whatever is currently visible.
#[async_trait]
pub trait VisibleSurface: Send + Sync {
    async fn capture_visible(&self) -> Result<RgbaImage, CaptureError>;
}

struct Envelope {
    message: ExtensionMessage,
    reply: oneshot::Sender<CaptureTabResponse>,
}

/// Message-passing transport with at most one request in flight.
///
/// Requests travel as [`ExtensionMessage::CaptureTab`] to a responder task
/// that owns the [`VisibleSurface`]; replies come back as PNG data URLs.
pub struct ChannelTransport {
    request_tx: mpsc::Sender<Envelope>,
    in_flight: Mutex<()>,
}

impl ChannelTransport {
    /// Spawns the responder task on `runtime_handle`.
    pub fn spawn(runtime_handle: &tokio::runtime::Handle, surface: Arc<dyn VisibleSurface>) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<Envelope>(1);

        runtime_handle.spawn(async move {
            while let Some(Envelope { message, reply }) = request_rx.recv().await {
                let response = respond(&message, surface.as_ref()).await;
                if reply.send(response).is_err() {
                    log::debug!("Capture requester went away before the reply");
                }
            }
            log::debug!("Capture transport responder stopped");
        });

        Self {
            request_tx,
            in_flight: Mutex::new(()),
        }
    }
}

async fn respond(message: &ExtensionMessage, surface: &dyn VisibleSurface) -> CaptureTabResponse {
    match message {
        ExtensionMessage::CaptureTab => {
            let image = match surface.capture_visible().await {
                Ok(image) => image,
                Err(e) => return CaptureTabResponse::error(e.to_string()),
            };
            match raster::encode_png(&image) {
                Ok(png) => CaptureTabResponse::image(&DataUrl::png(png)),
                Err(e) => CaptureTabResponse::error(e.to_string()),
            }
        }
        other => CaptureTabResponse::error(format!("unsupported action: {}", other.to_json())),
    }
}

#[async_trait]
impl CaptureTransport for ChannelTransport {
    async fn request_capture(&self) -> CaptureResult {
        // Held for the whole round trip so a second caller waits its turn.
        let _slot = self.in_flight.lock().await;

        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            message: ExtensionMessage::CaptureTab,
            reply: reply_tx,
        };
        if self.request_tx.send(envelope).await.is_err() {
            return CaptureResult::Error("capture responder not running".to_string());
        }

        match reply_rx.await {
            Ok(response) => response.into_result(),
            Err(_) => CaptureResult::Error("capture responder dropped the request".to_string()),
        }
    }
}
