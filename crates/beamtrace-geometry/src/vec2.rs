//! The 2D vector value type and the vector helpers built on it.
//!
//! [`Vec2`] doubles as a position, an (unnormalized) direction, and a surface
//! normal; all helper functions are free functions over it.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use thiserror::Error;

/// Errors from the geometry kernel.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Cannot normalize a zero-length vector")]
    DegenerateVector,

    #[error("Angle argument {0} outside the asin domain [-1, 1]")]
    AngleOutOfDomain(f64),
}

/// An (x, y) coordinate pair. Immutable value type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Rotate `p` by `angle` radians about the origin.
pub fn rotate(p: Vec2, angle: f64) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(p.x * c - p.y * s, p.x * s + p.y * c)
}

/// Scalar 2D cross product.
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

pub fn dot(a: Vec2, b: Vec2) -> f64 {
    a.x * b.x + a.y * b.y
}

pub fn distance(a: Vec2, b: Vec2) -> f64 {
    (b - a).length()
}

/// Unit vector in the direction of `p`.
pub fn normalize(p: Vec2) -> Result<Vec2, GeometryError> {
    let len = p.length();
    if len == 0.0 {
        return Err(GeometryError::DegenerateVector);
    }
    Ok(p / len)
}

/// Signed angle from `v1` to `v2` via `asin(cross / (|v1||v2|))`.
///
/// Valid only for angles within ±90°: near-antiparallel vectors fold back
/// into the asin range and callers must not rely on the result there. The
/// downstream sign-flip logic in the propagation engine is tuned to this
/// convention, so the restriction is preserved rather than generalized.
pub fn signed_angle(v1: Vec2, v2: Vec2) -> Result<f64, GeometryError> {
    let d = v1.length() * v2.length();
    if d == 0.0 {
        return Err(GeometryError::DegenerateVector);
    }
    let arg = cross(v1, v2) / d;
    // Float noise can push |arg| marginally past 1 for near-perpendicular
    // pairs; surface it instead of returning NaN.
    if arg.abs() > 1.0 {
        return Err(GeometryError::AngleOutOfDomain(arg));
    }
    Ok(arg.asin())
}

/// Unit normal of the segment a→b: the direction rotated by −90°.
pub fn normal_dir(a: Vec2, b: Vec2) -> Result<Vec2, GeometryError> {
    let d = b - a;
    normalize(Vec2::new(d.y, -d.x))
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f64 {
    type Output = Vec2;
    fn mul(self, rhs: Vec2) -> Vec2 {
        rhs * self
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotate_quarter_turn() {
        let p = rotate(Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_zero_fails() {
        assert_eq!(normalize(Vec2::ZERO), Err(GeometryError::DegenerateVector));
    }

    #[test]
    fn test_normal_dir_convention() {
        // Segment pointing +y has its normal pointing +x.
        let n = normal_dir(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0)).unwrap();
        assert_relative_eq!(n.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(n.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_signed_angle_sign() {
        let a = signed_angle(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)).unwrap();
        let b = signed_angle(Vec2::new(1.0, 0.0), Vec2::new(1.0, -1.0)).unwrap();
        assert_relative_eq!(a, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(b, -std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_signed_angle_degenerate() {
        assert!(signed_angle(Vec2::ZERO, Vec2::new(1.0, 0.0)).is_err());
    }
}
