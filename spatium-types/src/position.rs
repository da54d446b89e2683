use serde::{Deserialize, Serialize};

/// A point on the 2D map, relative to the map center. Screen orientation:
/// +x to the right, +y downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance from the map center.
    pub fn radius(&self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Point at `radius` along the screen angle `angle_rad` (measured from +x).
    pub fn from_polar(radius: f32, angle_rad: f32) -> Self {
        Self {
            x: radius * angle_rad.cos(),
            y: radius * angle_rad.sin(),
        }
    }
}
