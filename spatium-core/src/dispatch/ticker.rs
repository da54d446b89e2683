use std::time::{Duration, Instant};

/// Fixed-interval schedule for dispatcher ticks. A late poll fires once and
/// re-anchors; missed ticks are never replayed in a burst.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next tick is due.
    pub fn next_at(&self) -> Instant {
        self.next
    }

    /// Whether a tick is due at `now`; advances the schedule if so.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }
}
