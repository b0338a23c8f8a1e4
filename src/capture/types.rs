//! Data types for screenshot capture functionality.

use std::time::Duration;

use thiserror::Error;

use super::compositor::CompositeError;

/// What part of the page a capture request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureMode {
    /// The currently visible viewport.
    Viewport,
    /// The whole scrollable page, stitched from viewport-sized segments.
    FullPage,
    /// A user-dragged rectangle inside the viewport.
    Selection,
    /// The client rect of the element matching a CSS selector.
    Element { selector: String },
}

/// Longest countdown a request may ask for, in seconds.
pub const MAX_DELAY_SECS: u64 = 60;

/// A single capture request, consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub mode: CaptureMode,
    /// Countdown before the capture starts.
    pub delay: Duration,
}

impl CaptureRequest {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
        }
    }

    /// Sets the countdown, capped at [`MAX_DELAY_SECS`].
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay.min(Duration::from_secs(MAX_DELAY_SECS));
        self
    }
}

/// Tunables for the capture pipeline, usually derived from the config file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    /// Pause after each scroll so lazy content and sticky headers settle.
    pub settle: Duration,
    /// Minimum selection width and height in CSS pixels.
    pub min_selection: i32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            min_selection: 5,
        }
    }
}

/// Successful result of a capture request, as handed to the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub mode: CaptureMode,
    /// PNG data URL passed along in the `openEditor` message.
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Outcome of a capture request (success or failure).
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Success(CapturedImage),
    Failed(String),
    Cancelled(String),
}

/// Errors that can occur during screenshot capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Visible area capture failed: {0}")]
    TransportFailed(String),

    #[error("Captured image could not be decoded: {0}")]
    Decode(String),

    #[error("Captured image could not be encoded: {0}")]
    Encode(String),

    #[error("Invalid capture geometry: {0}")]
    Geometry(String),

    #[error("Composition failed: {0}")]
    Composite(#[from] CompositeError),

    #[error("No element matches selector '{0}'")]
    ElementNotFound(String),

    #[error("Failed to save screenshot: {0}")]
    SaveError(#[from] std::io::Error),

    #[error("Editor handoff failed: {0}")]
    EditorHandoff(String),

    #[error("Capture manager not running")]
    ManagerStopped,

    #[error("Capture cancelled: {0}")]
    Cancelled(String),
}

/// Status of an ongoing capture operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Capture is idle/not started.
    Idle,
    /// Counting down a requested delay.
    CountingDown,
    /// Waiting for the user to drag a selection.
    AwaitingSelection,
    /// Capture is in progress.
    InProgress,
    /// Capture completed successfully.
    Success,
    /// Capture failed.
    Failed(String),
    /// Capture was cancelled or abandoned by the user.
    Cancelled(String),
}
