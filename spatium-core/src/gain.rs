//! Distance → gain.
//!
//! Inverse-square law scaled by the falloff compensation, with a hard
//! ceiling. Values are rounded to 3 decimals before transmission so tiny
//! float jitter never reaches the graph.

/// Parameters of the inverse-square gain law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainLaw {
    /// Distances below this are treated as this (meters).
    pub min_distance_m: f32,
    /// Distances above this are treated as this (meters).
    pub max_distance_m: f32,
    /// Hard upper bound on the linear gain.
    pub ceiling: f32,
}

pub const DEFAULT_GAIN_CEILING: f32 = 15.0;

impl Default for GainLaw {
    fn default() -> Self {
        Self {
            min_distance_m: 0.1,
            max_distance_m: 100.0,
            ceiling: DEFAULT_GAIN_CEILING,
        }
    }
}

impl GainLaw {
    /// `compensation / d²`, with `d` clamped into the law's distance range
    /// and the result capped at the ceiling, rounded to 3 decimals.
    pub fn gain(&self, distance_m: f32, compensation: f32) -> f32 {
        let d = if distance_m.is_nan() {
            self.max_distance_m
        } else {
            distance_m.clamp(self.min_distance_m, self.max_distance_m)
        };
        let raw = compensation / (d * d);
        round3(raw.min(self.ceiling))
    }
}

/// Round to 3 decimal places.
pub fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
