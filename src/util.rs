//! Utility functions for colors, geometry, and arrowhead calculations.
//!
//! This module provides:
//! - Color name parsing used by the config and the annotate command
//! - Arrowhead geometry calculations
//! - An integer rectangle type shared by the selection overlay, cropping and
//!   the region effects

use crate::draw::{Color, color::*};

// ============================================================================
// Arrowhead Geometry
// ============================================================================

/// Calculates the two base corners of an arrowhead.
///
/// The head sits at the tip `(x2, y2)` and points along the shaft direction
/// from `(x1, y1)` to `(x2, y2)`. Each side of the head is rotated by
/// `angle_degrees` away from the shaft and has length `length`.
///
/// # Returns
/// Array of two points `[(left_x, left_y), (right_x, right_y)]`. Together with
/// the tip they form the filled head triangle. If the shaft is shorter than one
/// pixel, both points equal the tip.
pub fn arrowhead_points(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    length: f64,
    angle_degrees: f64,
) -> [(f64, f64); 2] {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if (dx * dx + dy * dy).sqrt() < 1.0 {
        return [(x2, y2), (x2, y2)];
    }

    let shaft_angle = dy.atan2(dx);
    let spread = angle_degrees.to_radians();

    let left = (
        x2 - length * (shaft_angle - spread).cos(),
        y2 - length * (shaft_angle - spread).sin(),
    );
    let right = (
        x2 - length * (shaft_angle + spread).cos(),
        y2 - length * (shaft_angle + spread).sin(),
    );

    [left, right]
}

/// Euclidean distance between two points, used as the circle tool radius.
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

// ============================================================================
// Color Mapping
// ============================================================================

/// Maps color name strings (or `#rrggbb` hex codes) to Color values.
///
/// # Supported Names (case-insensitive)
/// - "red", "green", "blue", "yellow", "orange", "white", "black"
pub fn name_to_color(name: &str) -> Option<Color> {
    match name.to_lowercase().as_str() {
        "red" => Some(RED),
        "green" => Some(GREEN),
        "blue" => Some(BLUE),
        "yellow" => Some(YELLOW),
        "orange" => Some(ORANGE),
        "white" => Some(WHITE),
        "black" => Some(BLACK),
        other if other.starts_with('#') => Color::from_hex(other),
        _ => None,
    }
}

// ============================================================================
// Geometry Utilities
// ============================================================================

/// Axis-aligned integer rectangle with positive area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Creates a new rectangle. Width/height must be positive.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Option<Self> {
        if width <= 0 || height <= 0 {
            None
        } else {
            Some(Self {
                x,
                y,
                width,
                height,
            })
        }
    }

    /// Builds a rectangle from min/max bounds (inclusive min, exclusive max).
    pub fn from_min_max(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Option<Self> {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Builds the rectangle spanned by two drag corners, in any direction.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        Self::from_min_max(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
    }

    /// Intersects the rectangle with `0..width` x `0..height`.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Self> {
        let max_x = (self.x + self.width).min(width as i32);
        let max_y = (self.y + self.height).min(height as i32);
        Self::from_min_max(self.x.max(0), self.y.max(0), max_x, max_y)
    }

    /// Scales every edge by `factor` and rounds to whole pixels.
    pub fn scale(&self, factor: f64) -> Option<Self> {
        let scale = |v: i32| (v as f64 * factor).round() as i32;
        Self::from_min_max(
            scale(self.x),
            scale(self.y),
            scale(self.x + self.width),
            scale(self.y + self.height),
        )
    }
}
