//! Planar vector aliases for COP trajectory math
//!
//! COP positions live on the mat surface, so everything downstream of the
//! COP engine works with 2-D vectors in meters.

use nalgebra::Vector2;

/// Position or displacement on the mat plane (x = columns, y = rows), meters
pub type Vec2 = Vector2<f64>;

// ===== Unit conversions =====
pub const M_TO_CM: f64 = 100.0;
pub const M2_TO_CM2: f64 = 10_000.0;

/// Z component of the 3-D cross product of two planar vectors
pub fn cross_z(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Euclidean distance between two positions
pub fn distance(a: &Vec2, b: &Vec2) -> f64 {
    (b - a).norm()
}
