//! Annotation editor: drawing tools over a captured image with bounded
//! undo/redo and PNG/JPEG/PDF export.

pub mod export;
pub mod history;
pub mod launch;
pub mod script;
pub mod session;

use thiserror::Error;

use crate::capture::dataurl::DataUrlError;
use crate::draw::RasterError;

pub use export::{ExportError, ExportFormat, ExportOptions};
pub use history::History;
pub use launch::{editor_url, image_param};
pub use script::{EditorCommand, replay};
pub use session::{EditorEvent, EditorOptions, EditorSession, ToolSettings};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invalid image data URL: {0}")]
    DataUrl(#[from] DataUrlError),

    #[error("editor URL has no image parameter")]
    MissingImage,

    #[error("invalid editor URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("editor script error: {0}")]
    Script(String),
}
