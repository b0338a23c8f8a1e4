use std::{path::PathBuf, sync::Arc};

use crate::capture::{
    dataurl::DataUrl,
    file::{self, FileSaveConfig},
    message::ExtensionMessage,
    page::PageSurface,
    selection::{FixedSelection, SelectionSource},
    sources::StaticPage,
    transport::{CaptureTransport, ChannelTransport},
    types::CaptureError,
};
use crate::notification::{LogNotifier, Notifier};

/// Receives finished captures; the editor side of the `openEditor` message.
pub trait EditorSink: Send + Sync {
    fn open_editor(&self, message: &ExtensionMessage) -> Result<(), CaptureError>;
}

/// Editor sink that writes every handed-off capture into a directory.
pub struct DirectorySink {
    config: FileSaveConfig,
}

impl DirectorySink {
    pub fn new(config: FileSaveConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.config.save_directory
    }
}

impl EditorSink for DirectorySink {
    fn open_editor(&self, message: &ExtensionMessage) -> Result<(), CaptureError> {
        let ExtensionMessage::OpenEditor { data_url } = message else {
            return Err(CaptureError::EditorHandoff(format!(
                "expected openEditor, got {}",
                message.to_json()
            )));
        };
        let url: DataUrl = data_url
            .parse()
            .map_err(|e| CaptureError::EditorHandoff(format!("bad image data URL: {e}")))?;
        let path = file::save_screenshot(url.data(), "png", &self.config)?;
        log::info!("Capture handed to editor as {}", path.display());
        Ok(())
    }
}

/// Bundle of dependencies used by the capture pipeline. Each component can be mocked in tests.
#[derive(Clone)]
pub struct CaptureDependencies {
    pub transport: Arc<dyn CaptureTransport>,
    pub page: Arc<dyn PageSurface>,
    pub selection: Arc<dyn SelectionSource>,
    pub editor: Arc<dyn EditorSink>,
    pub notifier: Arc<dyn Notifier>,
}

impl CaptureDependencies {
    /// Wires a static page as both the page and the visible-area producer.
    ///
    /// Selections come from `selection`; without one, every selection is
    /// abandoned. Finished captures go to `editor`.
    pub fn for_static_page(
        runtime_handle: &tokio::runtime::Handle,
        page: Arc<StaticPage>,
        selection: Option<Arc<dyn SelectionSource>>,
        editor: Arc<dyn EditorSink>,
    ) -> Self {
        let transport = ChannelTransport::spawn(runtime_handle, page.clone());
        Self {
            transport: Arc::new(transport),
            page,
            selection: selection.unwrap_or_else(|| Arc::new(FixedSelection(None))),
            editor,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
