//! Axis-aligned bounding boxes.
//!
//! Used to gate which elements a ray segment can possibly reach before the
//! exact per-surface intersection tests run.

use crate::vec2::Vec2;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing all points. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = Aabb::new(first, first);
        for p in iter {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
        }
        Some(bb)
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(self, margin: f64) -> Self {
        Self {
            min: Vec2::new(self.min.x - margin, self.min.y - margin),
            max: Vec2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f64 {
        (self.max.x - self.min.x).hypot(self.max.y - self.min.y)
    }

    /// Slab test: does the segment (p1, p2) cross this box?
    pub fn intersects_segment(&self, p1: Vec2, p2: Vec2) -> bool {
        let d = p2 - p1;
        let mut tmin = 0.0_f64;
        let mut tmax = 1.0_f64;

        for (start, delta, lo, hi) in [
            (p1.x, d.x, self.min.x, self.max.x),
            (p1.y, d.y, self.min.y, self.max.y),
        ] {
            if delta == 0.0 {
                if start < lo || start > hi {
                    return false;
                }
            } else {
                let mut t1 = (lo - start) / delta;
                let mut t2 = (hi - start) / delta;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return false;
                }
            }
        }
        true
    }
}
