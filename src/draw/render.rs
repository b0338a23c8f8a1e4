//! Cairo-based rendering functions for annotations.

use image::RgbaImage;

use super::color::Color;
use super::effects;
use super::font::FontDescriptor;
use super::raster::{self, RasterError};
use super::shape::Annotation;
use crate::util;

/// Applies a completed annotation to the canvas.
///
/// Vector annotations are stroked through Cairo; region effects (mosaic and
/// blur) operate directly on the raster.
pub fn apply_annotation(canvas: &mut RgbaImage, annotation: &Annotation) -> Result<(), RasterError> {
    match annotation {
        Annotation::Mosaic { region, block } => {
            effects::mosaic(canvas, *region, *block);
            Ok(())
        }
        Annotation::Blur { region, radius } => {
            effects::box_blur(canvas, *region, *radius);
            Ok(())
        }
        vector => raster::draw_with_cairo(canvas, |ctx| render_annotation(ctx, vector)),
    }
}

/// Renders a single vector annotation to a Cairo context.
///
/// Region effects have no vector representation and are ignored here.
pub fn render_annotation(ctx: &cairo::Context, annotation: &Annotation) -> Result<(), cairo::Error> {
    match annotation {
        Annotation::Line {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
        } => render_line(ctx, *x1, *y1, *x2, *y2, *color, *width),
        Annotation::Arrow {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
            head_length,
            head_angle,
        } => render_arrow(
            ctx,
            *x1,
            *y1,
            *x2,
            *y2,
            *color,
            *width,
            *head_length,
            *head_angle,
        ),
        Annotation::Rect {
            x,
            y,
            w,
            h,
            color,
            width,
        } => render_rect(ctx, *x, *y, *w, *h, *color, *width),
        Annotation::Circle {
            cx,
            cy,
            radius,
            color,
            width,
        } => render_circle(ctx, *cx, *cy, *radius, *color, *width),
        Annotation::Text {
            x,
            y,
            text,
            color,
            size,
            font,
        } => render_text(ctx, *x, *y, text, *color, *size, font),
        Annotation::Mosaic { .. } | Annotation::Blur { .. } => Ok(()),
    }
}

/// Render a straight line
fn render_line(
    ctx: &cairo::Context,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: Color,
    width: f64,
) -> Result<(), cairo::Error> {
    ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    ctx.set_line_width(width);
    ctx.set_line_cap(cairo::LineCap::Round);

    ctx.new_path();
    ctx.move_to(x1 as f64, y1 as f64);
    ctx.line_to(x2 as f64, y2 as f64);
    ctx.stroke()
}

/// Render a rectangle outline
fn render_rect(
    ctx: &cairo::Context,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    color: Color,
    width: f64,
) -> Result<(), cairo::Error> {
    ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    ctx.set_line_width(width);
    ctx.set_line_join(cairo::LineJoin::Miter);

    ctx.new_path();
    ctx.rectangle(x as f64, y as f64, w as f64, h as f64);
    ctx.stroke()
}

/// Render a circle outline
fn render_circle(
    ctx: &cairo::Context,
    cx: i32,
    cy: i32,
    radius: f64,
    color: Color,
    width: f64,
) -> Result<(), cairo::Error> {
    if radius <= 0.0 {
        return Ok(());
    }

    ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    ctx.set_line_width(width);

    ctx.new_path();
    ctx.arc(
        cx as f64,
        cy as f64,
        radius,
        0.0,
        2.0 * std::f64::consts::PI,
    );
    ctx.stroke()
}

/// Render an arrow (shaft plus filled head at the end point)
#[allow(clippy::too_many_arguments)]
fn render_arrow(
    ctx: &cairo::Context,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: Color,
    width: f64,
    head_length: f64,
    head_angle: f64,
) -> Result<(), cairo::Error> {
    render_line(ctx, x1, y1, x2, y2, color, width)?;

    let (tip_x, tip_y) = (x2 as f64, y2 as f64);
    let [left, right] =
        util::arrowhead_points(x1 as f64, y1 as f64, tip_x, tip_y, head_length, head_angle);

    ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    ctx.new_path();
    ctx.move_to(tip_x, tip_y);
    ctx.line_to(left.0, left.1);
    ctx.line_to(right.0, right.1);
    ctx.close_path();
    ctx.fill()
}

/// Renders text with its baseline starting at (x, y) using Pango.
///
/// Newlines in `text` produce additional lines using the font's line spacing.
pub fn render_text(
    ctx: &cairo::Context,
    x: i32,
    y: i32,
    text: &str,
    color: Color,
    size: f64,
    font: &FontDescriptor,
) -> Result<(), cairo::Error> {
    ctx.save()?;
    ctx.set_antialias(cairo::Antialias::Gray);

    let layout = pangocairo::functions::create_layout(ctx);
    let font_desc = pango::FontDescription::from_string(&font.to_pango_string(size));
    layout.set_font_description(Some(&font_desc));
    layout.set_text(text);

    // Pango positions layouts by their top-left corner
    let baseline = layout.baseline() as f64 / pango::SCALE as f64;

    ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    ctx.move_to(x as f64, y as f64 - baseline);
    pangocairo::functions::show_layout(ctx, &layout);

    ctx.restore()
}
