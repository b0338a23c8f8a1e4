//! Exporting the annotated canvas as PNG, JPEG or PDF.

use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::file::{self, FileSaveConfig};
use crate::draw::raster::{self, RasterError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),

    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] cairo::Error),

    #[error("PDF stream error: {0}")]
    PdfStream(String),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// File formats the editor can save to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Pdf => "pdf",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Options that shape the exported bytes and file name.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    pub save: FileSaveConfig,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            jpeg_quality: 90,
            save: FileSaveConfig::default(),
        }
    }
}

/// `screenshot_2024-05-01T12-30-45-123Z.png` and friends.
pub fn export_filename(prefix: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    file::generate_filename(prefix, format.extension(), now)
}

/// Encodes the canvas in `format`.
pub fn encode(canvas: &RgbaImage, format: ExportFormat, jpeg_quality: u8) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => Ok(raster::encode_png(canvas)?),
        ExportFormat::Jpeg => encode_jpeg(canvas, jpeg_quality),
        ExportFormat::Pdf => encode_pdf(canvas),
    }
}

/// Drops the alpha channel by compositing over black.
fn flatten_on_black(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        let scale = |c: u8| ((u32::from(c) * u32::from(a) + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

fn encode_jpeg(canvas: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let rgb = flatten_on_black(canvas);
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(buffer.into_inner())
}

/// Single-page PDF whose page is the size of the canvas in pixels.
fn encode_pdf(canvas: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let image = raster::to_surface(canvas)?;
    let surface = cairo::PdfSurface::for_stream(
        f64::from(canvas.width()),
        f64::from(canvas.height()),
        Vec::<u8>::new(),
    )?;
    {
        let ctx = cairo::Context::new(&surface)?;
        ctx.set_source_surface(&image, 0.0, 0.0)?;
        ctx.paint()?;
        ctx.show_page()?;
    }

    let stream = surface
        .finish_output_stream()
        .map_err(|e| ExportError::PdfStream(e.to_string()))?;
    stream
        .downcast::<Vec<u8>>()
        .map(|bytes| *bytes)
        .map_err(|_| ExportError::PdfStream("unexpected stream type".to_string()))
}

/// Encodes the canvas and writes it into the configured directory.
pub fn save(canvas: &RgbaImage, options: &ExportOptions) -> Result<PathBuf, ExportError> {
    let bytes = encode(canvas, options.format, options.jpeg_quality)?;
    let path = file::save_screenshot(&bytes, options.format.extension(), &options.save)?;
    log::info!(
        "Exported {}x{} canvas as {} to {}",
        canvas.width(),
        canvas.height(),
        options.format,
        path.display()
    );
    Ok(path)
}
