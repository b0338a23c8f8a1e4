//! Input vocabulary shared by the selection overlay and the editor.
//!
//! Keys arrive as DOM-style names; modifiers track the
//! Shift state that squares a selection; tools name what a drag does.

pub mod events;
pub mod modifiers;
pub mod tool;

pub use events::Key;
pub use modifiers::Modifiers;
pub use tool::Tool;
