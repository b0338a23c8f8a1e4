//! Configuration type definitions.

use super::enums::ColorSpec;
use crate::editor::ExportFormat;
use crate::input::Tool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Capture pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// Pause after each scroll before capturing, in milliseconds (valid range: 0 - 5000)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Smallest selection, in CSS pixels, that still triggers a capture (valid range: 1 - 100)
    #[serde(default = "default_min_selection")]
    pub min_selection: i32,

    /// Countdown in seconds used when a request does not name one (valid range: 0 - 60)
    #[serde(default)]
    pub default_delay: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            min_selection: default_min_selection(),
            default_delay: 0,
        }
    }
}

/// Annotation editor defaults.
///
/// Tool, color and width are only starting values; the editor toolbar changes
/// them per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EditorConfig {
    /// Tool selected when the editor opens
    #[serde(default)]
    pub default_tool: Tool,

    /// Default ink color - a named color (red, green, blue, yellow, orange, white, black),
    /// a `#rrggbb` string or an RGB array like `[255, 0, 0]`
    #[serde(default = "default_color")]
    pub default_color: ColorSpec,

    /// Default stroke width in pixels (valid range: 1.0 - 50.0)
    #[serde(default = "default_width")]
    pub default_width: f64,

    /// Font family name for text annotations (e.g., "Sans", "Monospace")
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font weight (e.g., "normal", "bold", "light", 400, 700)
    #[serde(default = "default_font_weight")]
    pub font_weight: String,

    /// Font style (e.g., "normal", "italic", "oblique")
    #[serde(default = "default_font_style")]
    pub font_style: String,

    /// Text size in pixels is the stroke width times this factor (valid range: 1.0 - 20.0)
    #[serde(default = "default_font_scale")]
    pub font_scale: f64,

    /// Number of canvas snapshots kept for undo/redo (valid range: 2 - 500)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Arrowhead side length in pixels (valid range: 5.0 - 50.0)
    #[serde(default = "default_arrow_length")]
    pub arrow_length: f64,

    /// Arrowhead half-angle in degrees (valid range: 15.0 - 60.0)
    #[serde(default = "default_arrow_angle")]
    pub arrow_angle_degrees: f64,

    /// Mosaic block edge in pixels (valid range: 2 - 64)
    #[serde(default = "default_mosaic_block")]
    pub mosaic_block: u32,

    /// Blur radius in pixels (valid range: 1 - 32)
    #[serde(default = "default_blur_radius")]
    pub blur_radius: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_tool: Tool::default(),
            default_color: default_color(),
            default_width: default_width(),
            font_family: default_font_family(),
            font_weight: default_font_weight(),
            font_style: default_font_style(),
            font_scale: default_font_scale(),
            history_capacity: default_history_capacity(),
            arrow_length: default_arrow_length(),
            arrow_angle_degrees: default_arrow_angle(),
            mosaic_block: default_mosaic_block(),
            blur_radius: default_blur_radius(),
        }
    }
}

/// Where and how captures and edited images are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportConfig {
    /// Output directory; `~` expands to the home directory
    #[serde(default = "default_export_directory")]
    pub directory: String,

    /// Text placed before the timestamp in file names
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// JPEG quality (valid range: 1 - 100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Format used when none is given on the command line (png, jpeg, pdf)
    #[serde(default)]
    pub default_format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
            filename_prefix: default_filename_prefix(),
            jpeg_quality: default_jpeg_quality(),
            default_format: ExportFormat::default(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_settle_ms() -> u64 {
    300
}

fn default_min_selection() -> i32 {
    5
}

fn default_color() -> ColorSpec {
    ColorSpec::Name("black".to_string())
}

fn default_width() -> f64 {
    4.0
}

fn default_font_family() -> String {
    "Sans".to_string()
}

fn default_font_weight() -> String {
    "normal".to_string()
}

fn default_font_style() -> String {
    "normal".to_string()
}

fn default_font_scale() -> f64 {
    4.0
}

fn default_history_capacity() -> usize {
    50
}

fn default_arrow_length() -> f64 {
    15.0
}

fn default_arrow_angle() -> f64 {
    30.0
}

fn default_mosaic_block() -> u32 {
    10
}

fn default_blur_radius() -> u32 {
    5
}

fn default_export_directory() -> String {
    "~/Pictures/Pagesnap".to_string()
}

fn default_filename_prefix() -> String {
    "screenshot".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}
