//! # Beamtrace Geometry
//!
//! 2D geometric primitives for the beamtrace ray-propagation engine.
//! Everything here is pure: vectors, rotations, line/line and line/circle
//! intersection, and the rigid frame transform that maps between an
//! element's local coordinates and scene coordinates.
//!
//! ## Modules
//!
//! - [`vec2`] — the [`Vec2`](vec2::Vec2) value type and vector helpers.
//! - [`intersect`] — line/line and line/circle intersection kernels.
//! - [`transform`] — rigid 2D frames (rotation + translation).
//! - [`aabb`] — axis-aligned bounding boxes for broad-phase culling.

pub mod aabb;
pub mod intersect;
pub mod transform;
pub mod vec2;

pub use aabb::Aabb;
pub use intersect::{line_circle, line_line};
pub use transform::Frame;
pub use vec2::{
    cross, distance, dot, normal_dir, normalize, rotate, signed_angle, GeometryError, Vec2,
};
