//! Drag-to-select overlay shown over the page for selection captures.
//!
//! The overlay is a small state machine fed with pointer and key events:
//!
//! ```text
//! Idle --pointer down--> Selecting --pointer up (>= min)--> Committed
//!   ^                       |  \--pointer up (< min)--> Idle (discarded)
//!   +------- Escape --------+
//! ```

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::types::CaptureError;
use crate::input::{Key, Modifiers};
use crate::util::Rect;

/// Input delivered to the overlay, in viewport CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    PointerDown { x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
    PointerUp { x: i32, y: i32 },
    KeyDown(Key),
    KeyUp(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Idle,
    Selecting {
        start: (i32, i32),
        current: (i32, i32),
    },
    Committed(Rect),
}

/// What a single event did to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// Still waiting for more input.
    Pending,
    /// Released below the minimum size; the overlay is gone and nothing is captured.
    Discarded,
    /// Escape pressed; the overlay is gone.
    Cancelled,
    /// A region was chosen.
    Committed(Rect),
}

/// Applies the square constraint to a drag vector.
///
/// Both axes take the smaller magnitude and keep their own sign.
pub fn constrain_drag(dx: i32, dy: i32, square: bool) -> (i32, i32) {
    if !square {
        return (dx, dy);
    }
    let size = dx.abs().min(dy.abs());
    let signed = |d: i32| if d < 0 { -size } else { size };
    (signed(dx), signed(dy))
}

/// Dimension label drawn next to the selection, e.g. `320 × 200`.
pub fn ruler_label(rect: &Rect) -> String {
    format!("{} × {}", rect.width, rect.height)
}

#[derive(Debug)]
pub struct SelectionOverlay {
    state: OverlayState,
    modifiers: Modifiers,
    min_size: i32,
}

impl SelectionOverlay {
    pub fn new(min_size: i32) -> Self {
        Self {
            state: OverlayState::Idle,
            modifiers: Modifiers::new(),
            min_size: min_size.max(1),
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Rectangle currently outlined on screen, if any.
    pub fn current_rect(&self) -> Option<Rect> {
        match self.state {
            OverlayState::Idle => None,
            OverlayState::Selecting { start, current } => self.rect_between(start, current),
            OverlayState::Committed(rect) => Some(rect),
        }
    }

    /// Label for the dimension ruler while dragging.
    pub fn ruler(&self) -> Option<String> {
        self.current_rect().map(|rect| ruler_label(&rect))
    }

    pub fn handle(&mut self, event: OverlayEvent) -> OverlayOutcome {
        if let OverlayState::Committed(_) = self.state {
            return OverlayOutcome::Pending;
        }

        match event {
            OverlayEvent::KeyDown(Key::Escape) => {
                log::debug!("Selection cancelled");
                self.state = OverlayState::Idle;
                OverlayOutcome::Cancelled
            }
            OverlayEvent::KeyDown(Key::Space) => match self.state {
                OverlayState::Selecting { start, current } => self.finish(start, current),
                _ => OverlayOutcome::Pending,
            },
            OverlayEvent::KeyDown(key) => {
                self.modifiers.update(key, true);
                OverlayOutcome::Pending
            }
            OverlayEvent::KeyUp(key) => {
                self.modifiers.update(key, false);
                OverlayOutcome::Pending
            }
            OverlayEvent::PointerDown { x, y } => {
                self.state = OverlayState::Selecting {
                    start: (x, y),
                    current: (x, y),
                };
                OverlayOutcome::Pending
            }
            OverlayEvent::PointerMove { x, y } => {
                if let OverlayState::Selecting { start, .. } = self.state {
                    self.state = OverlayState::Selecting {
                        start,
                        current: (x, y),
                    };
                }
                OverlayOutcome::Pending
            }
            OverlayEvent::PointerUp { x, y } => match self.state {
                OverlayState::Selecting { start, .. } => self.finish(start, (x, y)),
                _ => OverlayOutcome::Pending,
            },
        }
    }

    fn finish(&mut self, start: (i32, i32), end: (i32, i32)) -> OverlayOutcome {
        match self
            .rect_between(start, end)
            .filter(|rect| rect.width >= self.min_size && rect.height >= self.min_size)
        {
            Some(rect) => {
                log::debug!("Selection committed: {:?}", rect);
                self.state = OverlayState::Committed(rect);
                OverlayOutcome::Committed(rect)
            }
            None => {
                log::debug!("Selection below {}px discarded", self.min_size);
                self.state = OverlayState::Idle;
                OverlayOutcome::Discarded
            }
        }
    }

    fn rect_between(&self, start: (i32, i32), end: (i32, i32)) -> Option<Rect> {
        let (dx, dy) = constrain_drag(
            end.0 - start.0,
            end.1 - start.1,
            self.modifiers.constrain_square(),
        );
        Rect::from_corners(start.0, start.1, start.0 + dx, start.1 + dy)
    }
}

/// Feeds events to an overlay until it commits, is cancelled or discarded,
/// or the event stream ends.
pub async fn run_overlay(
    overlay: &mut SelectionOverlay,
    events: &mut mpsc::Receiver<OverlayEvent>,
) -> Option<Rect> {
    while let Some(event) = events.recv().await {
        match overlay.handle(event) {
            OverlayOutcome::Pending => {
                if let Some(label) = overlay.ruler() {
                    log::trace!("Selection ruler: {}", label);
                }
            }
            OverlayOutcome::Committed(rect) => return Some(rect),
            OverlayOutcome::Cancelled | OverlayOutcome::Discarded => return None,
        }
    }
    None
}

/// Source of user selections for the selection capture mode.
#[async_trait]
pub trait SelectionSource: Send + Sync {
    /// Waits for the user to pick a region. `None` means abandoned.
    async fn select(&self, min_size: i32) -> Result<Option<Rect>, CaptureError>;
}

/// Selection source driven by an event channel, one overlay per request.
pub struct ChannelSelection {
    events: Mutex<mpsc::Receiver<OverlayEvent>>,
}

impl ChannelSelection {
    /// Returns the source and the sender frontends push events into.
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<OverlayEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                events: Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl SelectionSource for ChannelSelection {
    async fn select(&self, min_size: i32) -> Result<Option<Rect>, CaptureError> {
        let mut events = self.events.lock().await;
        let mut overlay = SelectionOverlay::new(min_size);
        Ok(run_overlay(&mut overlay, &mut events).await)
    }
}

/// Selection source that always returns the same region.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelection(pub Option<Rect>);

#[async_trait]
impl SelectionSource for FixedSelection {
    async fn select(&self, min_size: i32) -> Result<Option<Rect>, CaptureError> {
        Ok(self
            .0
            .filter(|rect| rect.width >= min_size && rect.height >= min_size))
    }
}
