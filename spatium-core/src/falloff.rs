//! Process-wide falloff compensation.
//!
//! One writer (the operator control), any number of readers (the gain model
//! on every conversion). The value is stored as f32 bits in an atomic and
//! every accepted write bumps a version counter, so readers can tell that
//! gains derived from an older value are stale.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

pub const DEFAULT_FALLOFF: f32 = 3.0;
pub const MIN_FALLOFF: f32 = 1.0;
pub const MAX_FALLOFF: f32 = 10.0;

#[derive(Clone, Debug)]
pub struct SharedFalloff {
    bits: Arc<AtomicU32>,
    version: Arc<AtomicU64>,
}

impl Default for SharedFalloff {
    fn default() -> Self {
        Self::new(DEFAULT_FALLOFF)
    }
}

impl SharedFalloff {
    pub fn new(initial: f32) -> Self {
        let value = sanitize(initial).unwrap_or(DEFAULT_FALLOFF);
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current compensation (lock-free atomic read).
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Number of accepted writes so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Store a new compensation, clamped to `[1, 10]`. NaN is rejected and
    /// leaves the value untouched. Returns the value now in effect.
    pub fn set(&self, value: f32) -> f32 {
        let Some(value) = sanitize(value) else {
            log::warn!(target: "engine", "ignoring non-numeric falloff compensation");
            return self.get();
        };
        if value.to_bits() == self.bits.load(Ordering::Acquire) {
            return value;
        }
        self.bits.store(value.to_bits(), Ordering::Release);
        self.version.fetch_add(1, Ordering::AcqRel);
        log::info!(target: "engine", "falloff compensation set to {}", value);
        value
    }
}

fn sanitize(value: f32) -> Option<f32> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(MIN_FALLOFF, MAX_FALLOFF))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_three() {
        let f = SharedFalloff::default();
        assert_eq!(f.get(), 3.0);
        assert_eq!(f.version(), 0);
    }

    #[test]
    fn set_clamps_and_bumps_version() {
        let f = SharedFalloff::default();
        assert_eq!(f.set(20.0), 10.0);
        assert_eq!(f.version(), 1);
        assert_eq!(f.set(0.2), 1.0);
        assert_eq!(f.version(), 2);
        assert_eq!(f.get(), 1.0);
    }

    #[test]
    fn unchanged_value_keeps_version() {
        let f = SharedFalloff::new(5.0);
        f.set(5.0);
        assert_eq!(f.version(), 0);
    }

    #[test]
    fn nan_is_ignored() {
        let f = SharedFalloff::new(4.0);
        assert_eq!(f.set(f32::NAN), 4.0);
        assert_eq!(f.version(), 0);
    }

    #[test]
    fn clones_share_state() {
        let writer = SharedFalloff::default();
        let reader = writer.clone();
        writer.set(7.0);
        assert_eq!(reader.get(), 7.0);
        assert_eq!(reader.version(), 1);
    }

    #[test]
    fn readers_on_other_threads_see_writes() {
        let writer = SharedFalloff::default();
        let reader = writer.clone();
        writer.set(6.5);
        let seen = std::thread::spawn(move || (reader.get(), reader.version()))
            .join()
            .unwrap();
        assert_eq!(seen, (6.5, 1));
    }
}
