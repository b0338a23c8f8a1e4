//! Annotation definitions for the screenshot editor.

use super::color::Color;
use super::font::FontDescriptor;
use crate::util::Rect;

/// A completed drawing operation on the editor canvas.
///
/// Each variant carries its own color and size information, captured from the
/// tool settings when the operation was started, so rendering never consults
/// ambient editor state.
#[derive(Clone, Debug, PartialEq)]
pub enum Annotation {
    /// Straight line between press and release points
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
        /// Stroke width in pixels
        width: f64,
    },
    /// Line with a filled triangular head at the release point
    Arrow {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
        width: f64,
        /// Length of each head side in pixels
        head_length: f64,
        /// Angle between each head side and the shaft, in degrees
        head_angle: f64,
    },
    /// Stroked axis-aligned rectangle (already normalized to positive size)
    Rect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
        width: f64,
    },
    /// Stroked circle centered on the press point
    Circle {
        cx: i32,
        cy: i32,
        radius: f64,
        color: Color,
        width: f64,
    },
    /// Literal text placed with its baseline at (x, y)
    Text {
        x: i32,
        y: i32,
        text: String,
        color: Color,
        /// Font size in pixels
        size: f64,
        font: FontDescriptor,
    },
    /// Block-average pixelation of a region
    Mosaic { region: Rect, block: u32 },
    /// Box blur of a region
    Blur { region: Rect, radius: u32 },
}

impl Annotation {
    /// Short lowercase name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Annotation::Line { .. } => "line",
            Annotation::Arrow { .. } => "arrow",
            Annotation::Rect { .. } => "rectangle",
            Annotation::Circle { .. } => "circle",
            Annotation::Text { .. } => "text",
            Annotation::Mosaic { .. } => "mosaic",
            Annotation::Blur { .. } => "blur",
        }
    }
}
