//! Interactive annotation session over a captured image.

use image::RgbaImage;

use super::EditorError;
use super::export::{self, ExportFormat, ExportOptions};
use super::history::History;
use super::launch;
use crate::capture::dataurl::DataUrl;
use crate::draw::{self, Annotation, Color, FontDescriptor, raster};
use crate::input::Tool;
use crate::util::{self, Rect};

/// Drawing parameters captured when an operation starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub tool: Tool,
    pub color: Color,
    /// Stroke width in pixels; also scales text size.
    pub width: f64,
    pub font: FontDescriptor,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Arrow,
            color: draw::BLACK,
            width: 4.0,
            font: FontDescriptor::default(),
        }
    }
}

/// Fixed editor parameters, usually from the `[editor]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorOptions {
    /// Text size in pixels is `width * font_scale`.
    pub font_scale: f64,
    pub history_capacity: usize,
    pub arrow_head_length: f64,
    pub arrow_head_angle: f64,
    pub mosaic_block: u32,
    pub blur_radius: u32,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            font_scale: 4.0,
            history_capacity: 50,
            arrow_head_length: 15.0,
            arrow_head_angle: 30.0,
            mosaic_block: 10,
            blur_radius: 5,
        }
    }
}

/// Something the frontend has to react to after a pointer press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A drag operation started; previews follow on pointer moves.
    DragStarted,
    /// The text tool wants a string to place with its baseline at (x, y).
    TextRequested { x: i32, y: i32 },
}

#[derive(Debug, Clone)]
struct Drag {
    start: (i32, i32),
    last: (i32, i32),
    settings: ToolSettings,
}

#[derive(Debug, Clone)]
struct PendingText {
    at: (i32, i32),
    settings: ToolSettings,
}

pub struct EditorSession {
    canvas: RgbaImage,
    history: History,
    settings: ToolSettings,
    options: EditorOptions,
    drag: Option<Drag>,
    pending_text: Option<PendingText>,
}

impl EditorSession {
    /// Seeds a session with `image` as the first history entry.
    pub fn new(image: RgbaImage, settings: ToolSettings, options: EditorOptions) -> Self {
        let history = History::new(image.clone(), options.history_capacity);
        log::debug!(
            "Editor session started on {}x{} image",
            image.width(),
            image.height()
        );
        Self {
            canvas: image,
            history,
            settings,
            options,
            drag: None,
            pending_text: None,
        }
    }

    pub fn from_data_url(
        data_url: &str,
        settings: ToolSettings,
        options: EditorOptions,
    ) -> Result<Self, EditorError> {
        let url: DataUrl = data_url.parse()?;
        let image = raster::decode(url.data())?;
        Ok(Self::new(image, settings, options))
    }

    /// Opens the image carried in an editor URL's `image` parameter.
    pub fn from_editor_url(
        editor_url: &str,
        settings: ToolSettings,
        options: EditorOptions,
    ) -> Result<Self, EditorError> {
        let data_url = launch::image_param(editor_url)?;
        Self::from_data_url(&data_url, settings, options)
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.settings.tool = tool;
    }

    pub fn set_color(&mut self, color: Color) {
        self.settings.color = color;
    }

    pub fn set_width(&mut self, width: f64) {
        self.settings.width = width.max(1.0);
    }

    pub fn set_font(&mut self, font: FontDescriptor) {
        self.settings.font = font;
    }

    pub fn is_drawing(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_down(&mut self, x: i32, y: i32) -> EditorEvent {
        let settings = self.settings.clone();
        if settings.tool.is_drag_tool() {
            self.pending_text = None;
            self.drag = Some(Drag {
                start: (x, y),
                last: (x, y),
                settings,
            });
            EditorEvent::DragStarted
        } else {
            self.drag = None;
            self.pending_text = Some(PendingText { at: (x, y), settings });
            EditorEvent::TextRequested { x, y }
        }
    }

    /// Tracks the pointer and returns a preview of the in-progress operation.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> Result<Option<RgbaImage>, EditorError> {
        match self.drag.as_mut() {
            Some(drag) => drag.last = (x, y),
            None => return Ok(None),
        }
        self.preview(x, y)
    }

    /// Renders the in-progress operation ending at (x, y) onto a copy of the
    /// canvas. History and the canvas are untouched.
    pub fn preview(&self, x: i32, y: i32) -> Result<Option<RgbaImage>, EditorError> {
        let Some(drag) = &self.drag else {
            return Ok(None);
        };
        let mut copy = self.canvas.clone();
        if let Some(annotation) = self.build_annotation(&drag.settings, drag.start, (x, y)) {
            draw::apply_annotation(&mut copy, &annotation)?;
        }
        Ok(Some(copy))
    }

    /// Completes the current drag at (x, y).
    ///
    /// Pushes exactly one history entry, even when the operation drew nothing.
    /// Returns the applied annotation, if any.
    pub fn pointer_up(&mut self, x: i32, y: i32) -> Result<Option<Annotation>, EditorError> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        let annotation = self.build_annotation(&drag.settings, drag.start, (x, y));
        if let Some(annotation) = &annotation {
            draw::apply_annotation(&mut self.canvas, annotation)?;
            log::debug!("Applied {} annotation", annotation.kind());
        }
        self.history.push(self.canvas.clone());
        Ok(annotation)
    }

    /// Leaving the canvas mid-drag completes the operation where the pointer
    /// was last seen.
    pub fn pointer_leave(&mut self) -> Result<Option<Annotation>, EditorError> {
        match self.drag.as_ref().map(|drag| drag.last) {
            Some((x, y)) => self.pointer_up(x, y),
            None => Ok(None),
        }
    }

    /// Places `text` at the pending text position. Empty text is ignored and
    /// leaves history untouched. Returns whether anything was drawn.
    pub fn insert_text(&mut self, text: &str) -> Result<bool, EditorError> {
        let Some(pending) = self.pending_text.take() else {
            return Ok(false);
        };
        if text.is_empty() {
            log::debug!("Empty text ignored");
            return Ok(false);
        }
        let annotation = Annotation::Text {
            x: pending.at.0,
            y: pending.at.1,
            text: text.to_string(),
            color: pending.settings.color,
            size: pending.settings.width * self.options.font_scale,
            font: pending.settings.font,
        };
        draw::apply_annotation(&mut self.canvas, &annotation)?;
        self.history.push(self.canvas.clone());
        Ok(true)
    }

    pub fn cancel_text(&mut self) {
        self.pending_text = None;
    }

    /// Applies a ready-made annotation as one history step.
    pub fn apply(&mut self, annotation: &Annotation) -> Result<(), EditorError> {
        draw::apply_annotation(&mut self.canvas, annotation)?;
        self.history.push(self.canvas.clone());
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.canvas = (*snapshot).clone();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.canvas = (*snapshot).clone();
                true
            }
            None => false,
        }
    }

    pub fn encode(&self, format: ExportFormat, jpeg_quality: u8) -> Result<Vec<u8>, EditorError> {
        Ok(export::encode(&self.canvas, format, jpeg_quality)?)
    }

    pub fn save(&self, options: &ExportOptions) -> Result<std::path::PathBuf, EditorError> {
        Ok(export::save(&self.canvas, options)?)
    }

    fn build_annotation(
        &self,
        settings: &ToolSettings,
        start: (i32, i32),
        end: (i32, i32),
    ) -> Option<Annotation> {
        let (x1, y1) = start;
        let (x2, y2) = end;
        let color = settings.color;
        let width = settings.width;
        match settings.tool {
            Tool::Line => Some(Annotation::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                width,
            }),
            Tool::Arrow => Some(Annotation::Arrow {
                x1,
                y1,
                x2,
                y2,
                color,
                width,
                head_length: self.options.arrow_head_length,
                head_angle: self.options.arrow_head_angle,
            }),
            Tool::Rectangle => Some(Annotation::Rect {
                x: x1.min(x2),
                y: y1.min(y2),
                w: (x2 - x1).abs(),
                h: (y2 - y1).abs(),
                color,
                width,
            }),
            Tool::Circle => Some(Annotation::Circle {
                cx: x1,
                cy: y1,
                radius: util::distance(x1 as f64, y1 as f64, x2 as f64, y2 as f64),
                color,
                width,
            }),
            Tool::Mosaic => Rect::from_corners(x1, y1, x2, y2).map(|region| Annotation::Mosaic {
                region,
                block: self.options.mosaic_block,
            }),
            Tool::Blur => Rect::from_corners(x1, y1, x2, y2).map(|region| Annotation::Blur {
                region,
                radius: self.options.blur_radius,
            }),
            Tool::Text => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    }

    fn session() -> EditorSession {
        EditorSession::new(white(120, 80), ToolSettings::default(), EditorOptions::default())
    }

    fn drag(session: &mut EditorSession, from: (i32, i32), to: (i32, i32)) {
        session.pointer_down(from.0, from.1);
        session.pointer_move(to.0, to.1).unwrap();
        session.pointer_up(to.0, to.1).unwrap();
    }

    #[test]
    fn each_completed_drag_pushes_one_entry() {
        let mut session = session();
        session.set_tool(Tool::Line);
        drag(&mut session, (10, 10), (100, 10));
        assert_eq!(session.history().len(), 2);
        assert_ne!(session.canvas().get_pixel(50, 10), &Rgba([255, 255, 255, 255]));

        // A zero-area mosaic draws nothing but still counts as an operation.
        session.set_tool(Tool::Mosaic);
        drag(&mut session, (5, 5), (5, 40));
        assert_eq!(session.history().len(), 3);
    }

    #[test]
    fn preview_leaves_canvas_and_history_alone() {
        let mut session = session();
        session.set_tool(Tool::Rectangle);
        session.pointer_down(10, 10);
        let preview = session.pointer_move(60, 50).unwrap().unwrap();
        assert_ne!(&preview, session.canvas());
        assert_eq!(session.canvas(), &white(120, 80));
        assert_eq!(session.history().len(), 1);
        assert!(session.preview(20, 20).unwrap().is_some());
    }

    #[test]
    fn undo_redo_restores_pixels() {
        let mut session = session();
        session.set_tool(Tool::Line);
        session.set_color(draw::RED);
        drag(&mut session, (10, 20), (110, 20));
        drag(&mut session, (10, 40), (110, 40));
        drag(&mut session, (10, 60), (110, 60));

        assert!(session.undo());
        let before = session.canvas().clone();
        assert!(session.undo());
        assert_ne!(session.canvas(), &before);
        assert!(session.redo());
        assert_eq!(session.canvas(), &before);
    }

    #[test]
    fn drawing_after_undo_discards_redo() {
        let mut session = session();
        session.set_tool(Tool::Circle);
        drag(&mut session, (40, 40), (60, 40));
        drag(&mut session, (80, 40), (90, 40));
        session.undo();
        drag(&mut session, (20, 20), (25, 20));
        let history = session.history();
        assert_eq!(history.len(), history.cursor() + 1);
        assert!(!session.redo());
    }

    #[test]
    fn text_tool_requests_input_and_ignores_empty_text() {
        let mut session = session();
        session.set_tool(Tool::Text);
        assert_eq!(
            session.pointer_down(10, 50),
            EditorEvent::TextRequested { x: 10, y: 50 }
        );
        assert!(!session.insert_text("").unwrap());
        assert_eq!(session.history().len(), 1);

        session.pointer_down(10, 50);
        assert!(session.insert_text("Hi").unwrap());
        assert_eq!(session.history().len(), 2);
        assert_ne!(session.canvas(), &white(120, 80));

        // No pending position: nothing happens.
        assert!(!session.insert_text("again").unwrap());
    }

    #[test]
    fn settings_are_captured_at_press_time() {
        let mut session = session();
        session.set_tool(Tool::Line);
        session.set_color(draw::BLUE);
        session.pointer_down(10, 30);
        session.set_color(draw::RED);
        session.set_tool(Tool::Blur);
        let annotation = session.pointer_up(100, 30).unwrap().unwrap();
        assert!(matches!(annotation, Annotation::Line { color, .. } if color == draw::BLUE));
    }

    #[test]
    fn leaving_canvas_completes_drag_at_last_position() {
        let mut session = session();
        session.set_tool(Tool::Arrow);
        session.pointer_down(10, 10);
        session.pointer_move(70, 10).unwrap();
        let annotation = session.pointer_leave().unwrap().unwrap();
        assert!(matches!(annotation, Annotation::Arrow { x2: 70, y2: 10, .. }));
        assert!(!session.is_drawing());
        assert!(session.pointer_leave().unwrap().is_none());
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn opens_from_editor_url() {
        let png = raster::encode_png(&white(6, 4)).unwrap();
        let data_url = DataUrl::png(png).to_string();
        let url = launch::editor_url("https://example.com/editor.html", &data_url).unwrap();
        let session = EditorSession::from_editor_url(
            url.as_str(),
            ToolSettings::default(),
            EditorOptions::default(),
        )
        .unwrap();
        assert_eq!(session.canvas().dimensions(), (6, 4));
    }
}
