//! Annotation tool selection.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation tool selection.
///
/// The active tool determines what happens between pointer press and release
/// on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Line with a triangular head at the release point
    #[default]
    Arrow,
    /// Straight line between press and release
    Line,
    /// Rectangle outline spanning press and release
    Rectangle,
    /// Circle centered on the press point
    Circle,
    /// Text typed in after the press
    Text,
    /// Pixelate the dragged region
    Mosaic,
    /// Blur the dragged region
    Blur,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Arrow,
        Tool::Line,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Text,
        Tool::Mosaic,
        Tool::Blur,
    ];

    /// Name used by the editor toolbar (`data-tool`) and the annotate command.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Arrow => "arrow",
            Tool::Line => "line",
            Tool::Rectangle => "rectangle",
            Tool::Circle => "circle",
            Tool::Text => "text",
            Tool::Mosaic => "mosaic",
            Tool::Blur => "blur",
        }
    }

    /// Whether the tool completes on pointer release (every tool but text).
    pub fn is_drag_tool(&self) -> bool {
        !matches!(self, Tool::Text)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .iter()
            .copied()
            .find(|tool| tool.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}
