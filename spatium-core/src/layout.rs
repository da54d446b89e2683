use std::f32::consts::TAU;

use spatium_types::Position;

/// Evenly spaced starting positions: channel `i` of `n` sits at screen angle
/// `360/n * (i-1)` (measured from +x) on a circle of `radius`.
pub fn initial_positions(n: usize, radius: f32) -> Vec<Position> {
    (0..n)
        .map(|i| Position::from_polar(radius, TAU * i as f32 / n as f32))
        .collect()
}
