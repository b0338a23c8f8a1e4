//! Generic input event types shared by the selection overlay and the editor.

/// Generic key representation.
///
/// Frontends map their native key codes to these values for unified input
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Regular character key (a-z, 0-9, symbols)
    Char(char),
    /// Escape key (cancel selection)
    Escape,
    /// Space bar (confirm selection)
    Space,
    /// Shift modifier (constrain selection to a square)
    Shift,
    /// Ctrl modifier
    Ctrl,
    /// Alt modifier
    Alt,
    /// Unmapped or unrecognized key
    Unknown,
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Key::Escape,
            " " | "Spacebar" => Key::Space,
            "Shift" => Key::Shift,
            "Control" => Key::Ctrl,
            "Alt" => Key::Alt,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Unknown,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_dom_key_names() {
        assert_eq!(Key::from_dom("Escape"), Key::Escape);
        assert_eq!(Key::from_dom(" "), Key::Space);
        assert_eq!(Key::from_dom("Shift"), Key::Shift);
        assert_eq!(Key::from_dom("z"), Key::Char('z'));
        assert_eq!(Key::from_dom("ArrowUp"), Key::Unknown);
    }
}
