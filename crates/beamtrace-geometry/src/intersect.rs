//! Line/line and line/circle intersection kernels.
//!
//! These are the two primitives every optical element's surface enumeration
//! is built from: flat faces and polygon edges use [`line_line`], curved lens
//! and mirror faces use [`line_circle`].

use crate::vec2::{cross, distance, normalize, Vec2};

/// Intersect segment (p1, p2) with segment (p3, p4).
///
/// Solves the 2×2 parametric system and returns the intersection point only
/// when both parameters lie in [0, 1]. Parallel and collinear segments
/// (cross of direction vectors == 0) return `None`, even when they overlap —
/// a documented limitation inherited from the element geometry, where
/// edge-on rays never carry energy into a surface.
pub fn line_line(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let r = p2 - p1;
    let s = p4 - p3;

    let denom = cross(r, s);
    if denom == 0.0 {
        return None;
    }

    let t = cross(p3 - p1, s) / denom;
    let u = cross(p1 - p3, r) / cross(s, r);

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(p1 + r * t)
    } else {
        None
    }
}

/// Intersect the infinite line through (p1, p2) with a circle.
///
/// Projects the circle center onto the line, then steps the perpendicular
/// half-chord both ways. Returns 0, 1 (tangent) or 2 points, ordered along
/// the line direction. The points are *not* restricted to the segment; the
/// caller applies its own forward filter. A negative radius is treated by
/// magnitude; a degenerate direction (p1 == p2) yields no points.
pub fn line_circle(p1: Vec2, p2: Vec2, center: Vec2, radius: f64) -> Vec<Vec2> {
    let r = radius.abs();

    let dir = match normalize(p2 - p1) {
        Ok(d) => d,
        Err(_) => return Vec::new(),
    };

    // Parameter of the center's projection onto the line.
    let t = dir.x * (center.x - p1.x) + dir.y * (center.y - p1.y);
    let foot = p1 + dir * t;
    let lec = distance(foot, center);

    if lec < r {
        let dt = (r * r - lec * lec).sqrt();
        vec![p1 + dir * (t - dt), p1 + dir * (t + dt)]
    } else if lec == r {
        vec![foot]
    } else {
        Vec::new()
    }
}
