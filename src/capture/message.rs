//! JSON messages exchanged between the page context and the privileged
//! capture context.
//!
//! Every message is an object tagged by `action`:
//!
//! ```json
//! {"action": "captureTab"}
//! {"action": "startCapture", "mode": "fullpage", "delay": 3}
//! {"action": "elementCapture", "elementSelector": "#main"}
//! {"action": "openEditor", "dataUrl": "data:image/png;base64,..."}
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::dataurl::DataUrl;
use super::transport::CaptureResult;
use super::types::{CaptureMode, CaptureRequest, MAX_DELAY_SECS};

/// Capture modes accepted by the `startCapture` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    Viewport,
    FullPage,
    Selection,
}

impl From<StartMode> for CaptureMode {
    fn from(mode: StartMode) -> Self {
        match mode {
            StartMode::Viewport => CaptureMode::Viewport,
            StartMode::FullPage => CaptureMode::FullPage,
            StartMode::Selection => CaptureMode::Selection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExtensionMessage {
    /// Ask the privileged side for an encoded image of the visible area.
    CaptureTab,
    /// Begin a capture in the page context.
    #[serde(rename_all = "camelCase")]
    StartCapture {
        mode: StartMode,
        /// Countdown in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    ElementCapture { element_selector: String },
    /// Hand a finished capture to the editor.
    #[serde(rename_all = "camelCase")]
    OpenEditor { data_url: String },
}

impl ExtensionMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings and numbers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Converts a capture-starting message into a pipeline request.
    ///
    /// Returns `None` for messages that do not start a capture. Negative or
    /// non-finite delays are treated as no delay; long ones are capped at
    /// [`MAX_DELAY_SECS`].
    pub fn to_capture_request(&self) -> Option<CaptureRequest> {
        match self {
            ExtensionMessage::StartCapture { mode, delay } => {
                let request = CaptureRequest::new((*mode).into());
                Some(match delay {
                    Some(secs) if secs.is_finite() && *secs > 0.0 => {
                        let secs = secs.min(MAX_DELAY_SECS as f64);
                        match Duration::try_from_secs_f64(secs) {
                            Ok(delay) => request.with_delay(delay),
                            Err(_) => request,
                        }
                    }
                    _ => request,
                })
            }
            ExtensionMessage::ElementCapture { element_selector } => {
                Some(CaptureRequest::new(CaptureMode::Element {
                    selector: element_selector.clone(),
                }))
            }
            ExtensionMessage::CaptureTab | ExtensionMessage::OpenEditor { .. } => None,
        }
    }
}

/// Reply to `captureTab`: exactly one of the fields is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTabResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureTabResponse {
    pub fn image(data_url: &DataUrl) -> Self {
        Self {
            data_url: Some(data_url.to_string()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data_url: None,
            error: Some(message.into()),
        }
    }

    /// Interprets the reply as a capture result.
    pub fn into_result(self) -> CaptureResult {
        if let Some(error) = self.error {
            return CaptureResult::Error(error);
        }
        match self.data_url {
            Some(url) => match url.parse::<DataUrl>() {
                Ok(url) => CaptureResult::Image(url.into_data()),
                Err(e) => CaptureResult::Error(format!("malformed data URL: {e}")),
            },
            None => CaptureResult::Error("empty capture response".to_string()),
        }
    }
}
