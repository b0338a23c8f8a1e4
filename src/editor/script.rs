//! Scripted editing: replays a list of editor commands against a session.
//!
//! Scripts are JSON arrays such as
//! `[{"op":"tool","tool":"rectangle"},{"op":"draw","from":[10,10],"to":[80,40]}]`.

use serde::{Deserialize, Serialize};

use super::EditorError;
use super::session::{EditorEvent, EditorSession};
use crate::draw::FontDescriptor;
use crate::input::Tool;
use crate::util;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditorCommand {
    Tool { tool: Tool },
    /// Color name (`red`, `blue`, ...) or `#rrggbb`.
    Color { color: String },
    Width { width: f64 },
    Font {
        family: String,
        #[serde(default = "default_font_weight")]
        weight: String,
        #[serde(default = "default_font_style")]
        style: String,
    },
    /// Press at `from`, move to and release at `to`.
    Draw { from: [i32; 2], to: [i32; 2] },
    /// Press with the text tool at `at` and type `text`.
    Text { at: [i32; 2], text: String },
    Undo,
    Redo,
}

fn default_font_weight() -> String {
    "normal".to_string()
}

fn default_font_style() -> String {
    "normal".to_string()
}

pub fn parse_script(json: &str) -> Result<Vec<EditorCommand>, EditorError> {
    serde_json::from_str(json).map_err(|e| EditorError::Script(e.to_string()))
}

impl EditorCommand {
    pub fn apply(&self, session: &mut EditorSession) -> Result<(), EditorError> {
        match self {
            EditorCommand::Tool { tool } => session.set_tool(*tool),
            EditorCommand::Color { color } => {
                let parsed = util::name_to_color(color)
                    .ok_or_else(|| EditorError::Script(format!("unknown color '{color}'")))?;
                session.set_color(parsed);
            }
            EditorCommand::Width { width } => session.set_width(*width),
            EditorCommand::Font {
                family,
                weight,
                style,
            } => session.set_font(FontDescriptor::new(
                family.clone(),
                weight.clone(),
                style.clone(),
            )),
            EditorCommand::Draw { from, to } => {
                match session.pointer_down(from[0], from[1]) {
                    EditorEvent::DragStarted => {}
                    EditorEvent::TextRequested { .. } => {
                        session.cancel_text();
                        return Err(EditorError::Script(
                            "draw needs a drag tool; use a text command for text".to_string(),
                        ));
                    }
                }
                session.pointer_move(to[0], to[1])?;
                session.pointer_up(to[0], to[1])?;
            }
            EditorCommand::Text { at, text } => {
                let previous = session.settings().tool;
                session.set_tool(Tool::Text);
                session.pointer_down(at[0], at[1]);
                let result = session.insert_text(text);
                session.set_tool(previous);
                result?;
            }
            EditorCommand::Undo => {
                if !session.undo() {
                    log::debug!("Nothing to undo");
                }
            }
            EditorCommand::Redo => {
                if !session.redo() {
                    log::debug!("Nothing to redo");
                }
            }
        }
        Ok(())
    }
}

/// Runs every command in order, stopping at the first error.
pub fn replay(session: &mut EditorSession, commands: &[EditorCommand]) -> Result<(), EditorError> {
    for (index, command) in commands.iter().enumerate() {
        command.apply(session).map_err(|e| {
            log::warn!("Editor command {} failed: {}", index, e);
            e
        })?;
    }
    log::info!(
        "Replayed {} editor commands ({} history entries)",
        commands.len(),
        session.history().len()
    );
    Ok(())
}
