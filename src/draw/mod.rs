//! Rendering primitives and annotation definitions (Cairo-based).
//!
//! This module defines the core drawing types used by the screenshot editor:
//! - [`Color`]: RGBA color representation with predefined color constants
//! - [`Annotation`]: the completed drawing operations (lines, arrows, text, ...)
//! - [`raster`]: conversions between RGBA buffers and Cairo surfaces
//! - [`effects`]: mosaic and blur applied directly to pixels

pub mod color;
pub mod effects;
pub mod font;
pub mod raster;
pub mod render;
pub mod shape;

pub use color::Color;
pub use font::FontDescriptor;
pub use raster::RasterError;
pub use render::{apply_annotation, render_annotation};
pub use shape::Annotation;

#[allow(unused_imports)]
pub use color::{BLACK, BLUE, GREEN, ORANGE, RED, WHITE, YELLOW};
