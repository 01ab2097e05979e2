//! Rigid 2D frames for mapping between local and scene coordinates.
//!
//! Elements and rays carry a position and a rotation; their geometry is
//! expressed in a local (unrotated, untranslated) frame. [`Frame`] performs
//! the mapping in both directions.

use nalgebra::{Rotation2, Vector2};

use crate::vec2::Vec2;

/// A rigid transform: rotation about the origin followed by translation.
#[derive(Debug, Clone)]
pub struct Frame {
    rotation: Rotation2<f64>,
    translation: Vector2<f64>,
}

impl Frame {
    /// Build a frame from a position and a rotation in degrees, matching the
    /// convention elements and rays are stored with.
    pub fn new(position: Vec2, rotation_deg: f64) -> Self {
        Self {
            rotation: Rotation2::new(rotation_deg.to_radians()),
            translation: Vector2::new(position.x, position.y),
        }
    }

    /// Map a local point into scene coordinates.
    pub fn to_scene(&self, p: Vec2) -> Vec2 {
        let v = self.rotation * Vector2::new(p.x, p.y) + self.translation;
        Vec2::new(v.x, v.y)
    }

    /// Map a scene point into local coordinates.
    pub fn to_local(&self, p: Vec2) -> Vec2 {
        let v = self.rotation.inverse() * (Vector2::new(p.x, p.y) - self.translation);
        Vec2::new(v.x, v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roundtrip() {
        let frame = Frame::new(Vec2::new(100.0, -50.0), 37.5);
        let p = Vec2::new(12.0, 3.0);
        let back = frame.to_local(frame.to_scene(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-12);
    }

    #[test]
    fn test_quarter_turn_and_shift() {
        let frame = Frame::new(Vec2::new(10.0, 0.0), 90.0);
        let p = frame.to_scene(Vec2::new(1.0, 0.0));
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }
}
