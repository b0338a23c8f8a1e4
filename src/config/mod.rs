//! Configuration file support for pagesnap.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/pagesnap/config.toml`. Settings cover the capture pipeline,
//! annotation editor defaults and export options.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

pub use enums::ColorSpec;
pub use types::{CaptureConfig, EditorConfig, ExportConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{CaptureSettings, MAX_DELAY_SECS};
use crate::capture::file::{self, FileSaveConfig};
use crate::draw::FontDescriptor;
use crate::editor::{EditorOptions, ExportOptions, ToolSettings};

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [capture]
/// settle_ms = 300
/// min_selection = 5
///
/// [editor]
/// default_tool = "rectangle"
/// default_color = "red"
/// default_width = 4.0
///
/// [export]
/// directory = "~/Pictures/Pagesnap"
/// default_format = "png"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Capture pipeline timing and selection limits
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Annotation editor defaults
    #[serde(default)]
    pub editor: EditorConfig,

    /// Output directory, file naming and encoding
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value and a warning is logged.
    pub fn validate_and_clamp(&mut self) {
        if self.capture.settle_ms > 5000 {
            log::warn!(
                "Invalid settle_ms {}, clamping to 0-5000 range",
                self.capture.settle_ms
            );
            self.capture.settle_ms = 5000;
        }

        if !(1..=100).contains(&self.capture.min_selection) {
            log::warn!(
                "Invalid min_selection {}, clamping to 1-100 range",
                self.capture.min_selection
            );
            self.capture.min_selection = self.capture.min_selection.clamp(1, 100);
        }

        if self.capture.default_delay > MAX_DELAY_SECS {
            log::warn!(
                "Invalid default_delay {}, clamping to 0-{} range",
                self.capture.default_delay,
                MAX_DELAY_SECS
            );
            self.capture.default_delay = MAX_DELAY_SECS;
        }

        let editor = &mut self.editor;

        if !(1.0..=50.0).contains(&editor.default_width) {
            log::warn!(
                "Invalid default_width {:.1}, clamping to 1.0-50.0 range",
                editor.default_width
            );
            editor.default_width = clamp_or(editor.default_width, 1.0, 50.0, 4.0);
        }

        if !(1.0..=20.0).contains(&editor.font_scale) {
            log::warn!(
                "Invalid font_scale {:.1}, clamping to 1.0-20.0 range",
                editor.font_scale
            );
            editor.font_scale = clamp_or(editor.font_scale, 1.0, 20.0, 4.0);
        }

        if !(2..=500).contains(&editor.history_capacity) {
            log::warn!(
                "Invalid history_capacity {}, clamping to 2-500 range",
                editor.history_capacity
            );
            editor.history_capacity = editor.history_capacity.clamp(2, 500);
        }

        if !(5.0..=50.0).contains(&editor.arrow_length) {
            log::warn!(
                "Invalid arrow length {:.1}, clamping to 5.0-50.0 range",
                editor.arrow_length
            );
            editor.arrow_length = clamp_or(editor.arrow_length, 5.0, 50.0, 15.0);
        }

        if !(15.0..=60.0).contains(&editor.arrow_angle_degrees) {
            log::warn!(
                "Invalid arrow angle {:.1}°, clamping to 15.0-60.0° range",
                editor.arrow_angle_degrees
            );
            editor.arrow_angle_degrees = clamp_or(editor.arrow_angle_degrees, 15.0, 60.0, 30.0);
        }

        if !(2..=64).contains(&editor.mosaic_block) {
            log::warn!(
                "Invalid mosaic_block {}, clamping to 2-64 range",
                editor.mosaic_block
            );
            editor.mosaic_block = editor.mosaic_block.clamp(2, 64);
        }

        if !(1..=32).contains(&editor.blur_radius) {
            log::warn!(
                "Invalid blur_radius {}, clamping to 1-32 range",
                editor.blur_radius
            );
            editor.blur_radius = editor.blur_radius.clamp(1, 32);
        }

        let valid_weight = matches!(
            editor.font_weight.to_lowercase().as_str(),
            "normal" | "bold" | "light" | "ultralight" | "heavy" | "ultrabold"
        ) || editor
            .font_weight
            .parse::<u32>()
            .is_ok_and(|w| (100..=900).contains(&w));

        if !valid_weight {
            log::warn!(
                "Invalid font_weight '{}', falling back to 'normal'",
                editor.font_weight
            );
            editor.font_weight = "normal".to_string();
        }

        if !matches!(
            editor.font_style.to_lowercase().as_str(),
            "normal" | "italic" | "oblique"
        ) {
            log::warn!(
                "Invalid font_style '{}', falling back to 'normal'",
                editor.font_style
            );
            editor.font_style = "normal".to_string();
        }

        if !(1..=100).contains(&self.export.jpeg_quality) {
            log::warn!(
                "Invalid jpeg_quality {}, clamping to 1-100 range",
                self.export.jpeg_quality
            );
            self.export.jpeg_quality = self.export.jpeg_quality.clamp(1, 100);
        }

        let prefix = &self.export.filename_prefix;
        if prefix.trim().is_empty() {
            log::warn!("Empty filename_prefix, falling back to 'screenshot'");
            self.export.filename_prefix = "screenshot".to_string();
        } else if prefix.contains(['/', '\\']) || prefix.contains("..") {
            log::warn!(
                "filename_prefix '{}' must not contain path separators or '..', falling back to 'screenshot'",
                prefix
            );
            self.export.filename_prefix = "screenshot".to_string();
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// The config file is located at `~/.config/pagesnap/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("pagesnap");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default path, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file
    /// does not exist. All loaded values are validated and clamped.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or contains
    /// invalid TOML.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// JSON schema describing the config file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            settle: Duration::from_millis(self.capture.settle_ms),
            min_selection: self.capture.min_selection,
        }
    }

    pub fn default_delay(&self) -> Duration {
        Duration::from_secs(self.capture.default_delay)
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            tool: self.editor.default_tool,
            color: self.editor.default_color.to_color(),
            width: self.editor.default_width,
            font: FontDescriptor::new(
                self.editor.font_family.clone(),
                self.editor.font_weight.clone(),
                self.editor.font_style.clone(),
            ),
        }
    }

    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            font_scale: self.editor.font_scale,
            history_capacity: self.editor.history_capacity,
            arrow_head_length: self.editor.arrow_length,
            arrow_head_angle: self.editor.arrow_angle_degrees,
            mosaic_block: self.editor.mosaic_block,
            blur_radius: self.editor.blur_radius,
        }
    }

    pub fn file_save_config(&self) -> FileSaveConfig {
        FileSaveConfig {
            save_directory: file::expand_tilde(&self.export.directory),
            filename_prefix: self.export.filename_prefix.clone(),
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            format: self.export.default_format,
            jpeg_quality: self.export.jpeg_quality,
            save: self.file_save_config(),
        }
    }
}

/// Clamps `value`, replacing NaN with `fallback`.
fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
