//! Bounded snapshot history with an undo/redo cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;

/// Canvas snapshots, oldest first.
///
/// The cursor always points at the snapshot matching the live canvas. Pushing
/// drops every entry after the cursor; once `capacity` is exceeded the oldest
/// entry is evicted and the cursor stays on the newest.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Arc<RgbaImage>>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// Starts a history whose only entry is `initial`.
    pub fn new(initial: RgbaImage, capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.max(1));
        entries.push_back(Arc::new(initial));
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: RgbaImage) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(Arc::new(snapshot));
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        } else {
            self.cursor += 1;
        }
    }

    /// Steps back one entry and returns it, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Arc<RgbaImage>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Steps forward one entry and returns it, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Arc<RgbaImage>> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn current(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn shade(value: u8) -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba([value, value, value, 255]))
    }

    fn value(image: &RgbaImage) -> u8 {
        image.get_pixel(0, 0)[0]
    }

    #[test]
    fn undo_then_redo_restores_snapshot() {
        let mut history = History::new(shade(0), 50);
        for v in 1..=4 {
            history.push(shade(v));
        }
        // Walk the cursor into the middle and check every interior position.
        for _ in 0..2 {
            history.undo();
        }
        assert_eq!(history.cursor(), 2);
        let before = history.current();
        let undone = history.undo().unwrap();
        assert_eq!(value(&undone), 1);
        let redone = history.redo().unwrap();
        assert_eq!(*redone, *before);
    }

    #[test]
    fn push_after_undo_truncates_redo_branch() {
        let mut history = History::new(shade(0), 50);
        for v in 1..=5 {
            history.push(shade(v));
        }
        history.undo();
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.push(shade(99));
        assert_eq!(history.len(), history.cursor() + 1);
        assert_eq!(history.len(), 4);
        assert!(!history.can_redo());
        assert_eq!(value(&history.current()), 99);
    }

    #[test]
    fn capacity_evicts_oldest_and_keeps_cursor_on_newest() {
        let mut history = History::new(shade(0), 3);
        for v in 1..=5 {
            history.push(shade(v));
            assert_eq!(history.cursor(), history.len() - 1);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(value(&history.current()), 5);

        assert_eq!(value(&history.undo().unwrap()), 4);
        assert_eq!(value(&history.undo().unwrap()), 3);
        assert!(history.undo().is_none());
    }

    #[test]
    fn bounds_are_no_ops() {
        let mut history = History::new(shade(7), 50);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 0);
        assert!(!history.can_undo());
        assert!(!history.is_empty());
    }
}
