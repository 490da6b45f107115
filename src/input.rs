use std::collections::VecDeque;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(2);
}

/// Pointer input as delivered by the host window, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Click { position: Vec2, button: MouseButton },
    Drag { delta: Vec2, button: MouseButton },
    Wheel { delta: f32 },
}

impl PointerEvent {
    pub fn click(x: f32, y: f32) -> Self {
        Self::Click {
            position: Vec2::new(x, y),
            button: MouseButton::LEFT,
        }
    }
}

/// Pointer events pushed from the host's event callbacks, possibly on
/// another thread, and drained once per render tick.
#[derive(Debug, Clone, Default)]
pub struct PointerQueue {
    events: Arc<Mutex<VecDeque<PointerEvent>>>,
}

impl PointerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PointerEvent) {
        self.events.lock().push_back(event);
    }

    /// Takes every queued event, oldest first.
    pub fn drain(&self) -> Vec<PointerEvent> {
        self.events.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_shared_between_clones() {
        let queue = PointerQueue::new();
        let host = queue.clone();
        let handle = std::thread::spawn(move || {
            host.push(PointerEvent::click(1.0, 2.0));
            host.push(PointerEvent::Wheel { delta: -1.0 });
        });
        handle.join().unwrap();

        assert_eq!(queue.len(), 2);
        let events = queue.drain();
        assert_eq!(events[0], PointerEvent::click(1.0, 2.0));
        assert_eq!(events[1], PointerEvent::Wheel { delta: -1.0 });
        assert!(queue.is_empty());
    }
}
