//! Screenshot capture for pagesnap.
//!
//! This module provides:
//! - Viewport, full-page, selection and element capture
//! - The request/response transport to the side that can read pixels
//! - Scroll-and-stitch segment capture with background composition
//! - The drag-to-select overlay
//! - Handoff of finished captures to the editor

pub mod compositor;
pub mod dataurl;
pub mod file;
pub mod message;
pub mod page;
pub mod segments;
pub mod selection;
pub mod sources;
pub mod transport;
pub mod types;

mod dependencies;
mod manager;
mod pipeline;
#[cfg(test)]
mod tests;

pub use dependencies::{CaptureDependencies, DirectorySink, EditorSink};
pub use manager::CaptureManager;
pub use message::ExtensionMessage;
pub use transport::{CaptureResult, CaptureTransport, ChannelTransport, VisibleSurface};
pub use types::{
    CaptureError, CaptureMode, CaptureOutcome, CaptureRequest, CaptureSettings, CaptureStatus,
    CapturedImage, MAX_DELAY_SECS,
};
