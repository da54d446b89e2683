//! Map position → azimuth / distance.
//!
//! Screen coordinates: origin at the map center, +x right, +y down.
//! Azimuth is a compass bearing: 0° at the top of the map, increasing
//! clockwise, always in `[0, 360)`. Distance is interpolated
//! logarithmically from pixels to meters so the inner part of the map gets
//! most of the resolution.

use spatium_types::Position;

/// Geometry of the map and the meter range it spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapGeometry {
    /// Radius of the draggable area, in map units (pixels).
    pub max_radius: f32,
    /// Distance at the center, meters. Must be > 0.
    pub min_distance_m: f32,
    /// Distance at the boundary, meters.
    pub max_distance_m: f32,
}

impl Default for MapGeometry {
    fn default() -> Self {
        Self {
            max_radius: 100.0,
            min_distance_m: 0.1,
            max_distance_m: 100.0,
        }
    }
}

/// Result of feeding one position through the transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Position after boundary clamping.
    pub position: Position,
    pub azimuth_deg: f32,
    pub distance_m: f32,
}

impl MapGeometry {
    /// Clamp, then derive azimuth and distance. Pure: feeding `placement.position`
    /// back in yields the same placement.
    pub fn place(&self, raw: Position) -> Placement {
        let position = clamp_to_radius(raw, self.max_radius);
        Placement {
            position,
            azimuth_deg: azimuth_deg(position),
            distance_m: self.distance_m(position.radius()),
        }
    }

    /// Logarithmic interpolation of a clamped pixel distance into
    /// `[min_distance_m, max_distance_m]`.
    pub fn distance_m(&self, pixels: f32) -> f32 {
        if self.max_radius <= 0.0 {
            return self.min_distance_m;
        }
        let t = (pixels / self.max_radius).clamp(0.0, 1.0) as f64;
        let lo = (self.min_distance_m as f64).log10();
        let hi = (self.max_distance_m as f64).log10();
        let meters = 10f64.powf(lo + (hi - lo) * t) as f32;
        meters.clamp(self.min_distance_m, self.max_distance_m)
    }

    /// Whether `meters` is inside the output range (inclusive on both ends).
    pub fn distance_in_range(&self, meters: f32) -> bool {
        meters.is_finite() && meters >= self.min_distance_m && meters <= self.max_distance_m
    }
}

/// Pull a position outside `max_radius` back onto the boundary circle along
/// the same ray. Positions inside (or on) the circle are returned unchanged.
pub fn clamp_to_radius(raw: Position, max_radius: f32) -> Position {
    let d = raw.radius();
    if d <= max_radius {
        return raw;
    }
    let angle = raw.y.atan2(raw.x);
    Position::from_polar(max_radius.max(0.0), angle)
}

/// Compass bearing of `pos`: 0° up, 90° right, in `[0, 360)`.
pub fn azimuth_deg(pos: Position) -> f32 {
    normalize_deg(pos.x.atan2(-pos.y).to_degrees())
}

/// Fold any angle into `[0, 360)`.
pub fn normalize_deg(deg: f32) -> f32 {
    let mut d = deg % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    // -1e-6 % 360 + 360 rounds to exactly 360.0 in f32
    if d >= 360.0 {
        d -= 360.0;
    }
    if d == 0.0 {
        0.0
    } else {
        d
    }
}

/// Snap an azimuth to multiples of `step` degrees, wrapping 360 to 0.
/// A non-positive step leaves the value alone.
pub fn quantize_azimuth(deg: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return normalize_deg(deg);
    }
    normalize_deg((deg / step).round() * step)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn geo() -> MapGeometry {
        MapGeometry::default()
    }

    #[test]
    fn outside_points_land_on_boundary_along_same_ray() {
        let samples = [(300.0, 0.0), (-150.0, 150.0), (0.0, -101.0), (70.0, 80.0), (-1e4, -3.0)];
        for (x, y) in samples {
            let raw = Position::new(x, y);
            let clamped = clamp_to_radius(raw, 100.0);
            assert!((clamped.radius() - 100.0).abs() < EPS, "({x},{y}) -> {:?}", clamped);
            // same ray: parallel and same direction
            let cross = raw.x * clamped.y - raw.y * clamped.x;
            let dot = raw.x * clamped.x + raw.y * clamped.y;
            assert!(cross.abs() / raw.radius() < EPS);
            assert!(dot > 0.0);
        }
    }

    #[test]
    fn inside_points_unchanged() {
        let p = Position::new(30.0, -40.0);
        assert_eq!(clamp_to_radius(p, 100.0), p);
    }

    #[test]
    fn azimuth_compass_points() {
        assert!((azimuth_deg(Position::new(0.0, -100.0)) - 0.0).abs() < EPS);
        assert!((azimuth_deg(Position::new(100.0, 0.0)) - 90.0).abs() < EPS);
        assert!((azimuth_deg(Position::new(0.0, 100.0)) - 180.0).abs() < EPS);
        assert!((azimuth_deg(Position::new(-100.0, 0.0)) - 270.0).abs() < EPS);
    }

    #[test]
    fn azimuth_always_in_range() {
        for i in 0..720 {
            let a = (i as f32).to_radians() * 0.5;
            for r in [0.0, 0.001, 1.0, 99.0] {
                let az = azimuth_deg(Position::from_polar(r, a));
                assert!((0.0..360.0).contains(&az), "azimuth {az} at angle {a}");
            }
        }
        let nearly_up_left = Position::new(-1e-7, -100.0);
        let az = azimuth_deg(nearly_up_left);
        assert!((0.0..360.0).contains(&az));
    }

    #[test]
    fn normalize_never_returns_360() {
        assert_eq!(normalize_deg(360.0), 0.0);
        assert_eq!(normalize_deg(-360.0), 0.0);
        assert!(normalize_deg(-1e-6) < 360.0);
        assert!((normalize_deg(-90.0) - 270.0).abs() < EPS);
        assert!((normalize_deg(725.0) - 5.0).abs() < EPS);
    }

    #[test]
    fn quantize_wraps_to_zero() {
        assert_eq!(quantize_azimuth(359.6, 1.0), 0.0);
        assert_eq!(quantize_azimuth(89.4, 1.0), 89.0);
        assert_eq!(quantize_azimuth(44.0, 5.0), 45.0);
        assert!((quantize_azimuth(12.345, 0.0) - 12.345).abs() < EPS);
    }

    #[test]
    fn distance_endpoints() {
        let g = geo();
        assert_eq!(g.distance_m(0.0), 0.1);
        assert!((g.distance_m(100.0) - 100.0).abs() < EPS);
        // halfway in log space: 10^(−1 + 1.5) ≈ 3.162
        assert!((g.distance_m(50.0) - 3.1623).abs() < EPS);
    }

    #[test]
    fn distance_monotonic_in_pixels() {
        let g = geo();
        let mut prev = g.distance_m(0.0);
        for i in 1..=1000 {
            let d = g.distance_m(i as f32 * 0.1);
            assert!(d >= prev, "distance decreased at {}", i);
            prev = d;
        }
        assert!(g.distance_m(100.0) > g.distance_m(0.0));
    }

    #[test]
    fn distance_never_zero_or_negative() {
        let g = geo();
        for px in [0.0, -5.0, 1e-9, 250.0] {
            assert!(g.distance_m(px) >= 0.1);
        }
    }

    #[test]
    fn zero_radius_geometry_returns_min() {
        let g = MapGeometry { max_radius: 0.0, ..geo() };
        assert_eq!(g.distance_m(0.0), 0.1);
        assert_eq!(g.distance_m(42.0), 0.1);
        let p = g.place(Position::new(10.0, 10.0));
        assert_eq!(p.distance_m, 0.1);
    }

    #[test]
    fn place_is_idempotent() {
        let g = geo();
        for (x, y) in [(250.0, -80.0), (12.0, 34.0), (0.0, 0.0), (-99.0, -99.0)] {
            let first = g.place(Position::new(x, y));
            let second = g.place(first.position);
            assert!((first.azimuth_deg - second.azimuth_deg).abs() < EPS);
            assert!((first.distance_m - second.distance_m).abs() < EPS);
            assert!((first.position.x - second.position.x).abs() < EPS);
            assert!((first.position.y - second.position.y).abs() < EPS);
        }
    }

    #[test]
    fn range_check_is_inclusive() {
        let g = geo();
        assert!(g.distance_in_range(0.1));
        assert!(g.distance_in_range(100.0));
        assert!(!g.distance_in_range(100.5));
        assert!(!g.distance_in_range(0.0));
        assert!(!g.distance_in_range(f32::NAN));
    }
}
