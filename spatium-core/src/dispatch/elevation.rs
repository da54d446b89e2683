//! Trailing-edge debounce for elevation changes.

use std::time::{Duration, Instant};

/// Single-shot timer holding the latest elevation. Every `set` restarts the
/// window; only the value present when the window expires is released.
#[derive(Debug, Clone, Default)]
pub struct ElevationDebounce {
    pending: Option<f32>,
    deadline: Option<Instant>,
}

impl ElevationDebounce {
    pub fn set(&mut self, degrees: f32, now: Instant, window: Duration) {
        self.pending = Some(degrees);
        self.deadline = Some(now + window);
    }

    /// Take the pending value if the window has expired.
    pub fn fire(&mut self, now: Instant) -> Option<f32> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<f32> {
        self.pending
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
