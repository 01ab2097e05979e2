//! Rays and their arena storage.
//!
//! A ray is a directed 2D segment with an intensity and one or more
//! wavelength components. Rays form a tree: a root ray (no parent) is placed
//! by the user and persisted; every descendant is derived by the propagation
//! engine and recomputed whenever the scene changes. Ownership runs
//! parent→children; the child→parent link is a non-owning handle, so the
//! tree lives in an index-based arena ([`RayArena`]) with stable [`RayId`]
//! handles.

use beamtrace_geometry::{normalize, Frame, Vec2};
use serde::{Deserialize, Serialize};

/// Default length of a freshly placed root ray, before the engine extends it
/// to cover the scene.
pub const DEFAULT_RAY_LENGTH: f64 = 2000.0;

/// Stable handle to a ray in a [`RayArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RayId(pub(crate) usize);

/// A visual tag for one wavelength component (HSLA). Physics-inert, but every
/// wavelength entry must have exactly one color entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub h: f64,
    pub s: f64,
    pub l: f64,
    pub alpha: f64,
}

impl Color {
    /// Spectrum tags for `n` wavelength components: hue sweeps the spectrum,
    /// saturation/lightness/alpha fixed.
    pub fn spectrum(n: usize) -> Vec<Color> {
        (0..n)
            .map(|i| Color {
                h: (1.0 - (i + 1) as f64 / n as f64) * 0.9,
                s: 0.95,
                l: 0.5,
                alpha: 0.75,
            })
            .collect()
    }
}

/// A directed ray segment with intensity and wavelength components.
#[derive(Debug, Clone)]
pub struct Ray {
    /// Scene position of the ray's local origin.
    pub position: Vec2,
    /// Rotation of the local frame in degrees.
    pub rotation_deg: f64,
    /// Segment start, local frame.
    pub p1: Vec2,
    /// Segment end, local frame.
    pub p2: Vec2,
    /// Intensity in (0, 1], normalized to an initial 1.0.
    pub intensity: f64,
    /// Wavelength components in micrometres. Never empty.
    pub wavelengths: Vec<f64>,
    /// One visual tag per wavelength component.
    pub colors: Vec<Color>,
    /// Whether direction arrows are displayed along the ray.
    pub show_arrow: bool,
    /// Set once the engine has finished intersecting this ray in the current
    /// recompute; a handled ray is never re-processed.
    pub handled: bool,
    /// Non-owning back-reference; `None` for root rays.
    pub parent: Option<RayId>,
    /// Owned children, in spawn order.
    pub children: Vec<RayId>,
}

impl Ray {
    /// A root ray at a scene position, pointing along its rotated +x axis.
    pub fn root(position: Vec2, rotation_deg: f64, intensity: f64, wavelengths: Vec<f64>) -> Self {
        debug_assert!(!wavelengths.is_empty(), "a ray needs at least one wavelength");
        let colors = Color::spectrum(wavelengths.len());
        Self {
            position,
            rotation_deg,
            p1: Vec2::ZERO,
            p2: Vec2::new(DEFAULT_RAY_LENGTH, 0.0),
            intensity,
            wavelengths,
            colors,
            show_arrow: false,
            handled: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A single-wavelength child spawned at a surface hit. `direction` is a
    /// unit vector in scene coordinates; the child's local frame is unrotated
    /// and anchored at the hit point.
    pub(crate) fn child(
        origin: Vec2,
        direction: Vec2,
        length: f64,
        intensity: f64,
        wavelength: f64,
        color: Color,
        show_arrow: bool,
        parent: RayId,
    ) -> Self {
        Self {
            position: origin,
            rotation_deg: 0.0,
            p1: direction,
            p2: direction * length,
            intensity,
            wavelengths: vec![wavelength],
            colors: vec![color],
            show_arrow,
            handled: false,
            parent: Some(parent),
            children: Vec::new(),
        }
    }

    /// The local→scene frame of this ray.
    pub fn frame(&self) -> Frame {
        Frame::new(self.position, self.rotation_deg)
    }

    /// Stretch the segment to `length`, keeping p1 and the direction. A
    /// degenerate segment is left untouched.
    pub fn set_length(&mut self, length: f64) {
        if let Ok(dir) = normalize(self.p2 - self.p1) {
            self.p2 = self.p1 + dir * length;
        }
    }

    /// Truncate the segment at a scene-coordinate point.
    pub fn set_end_scene(&mut self, end: Vec2) {
        self.p2 = self.frame().to_local(end);
    }

    /// Current segment length.
    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).length()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Index-based arena holding the ray tree.
///
/// Handles stay valid until their ray is removed; freed slots are reused for
/// later insertions. Iteration runs in slot order, which fixes the engine's
/// deterministic processing order.
#[derive(Debug, Default)]
pub struct RayArena {
    slots: Vec<Option<Ray>>,
    free: Vec<usize>,
}

impl RayArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ray: Ray) -> RayId {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(ray);
                RayId(idx)
            }
            None => {
                self.slots.push(Some(ray));
                RayId(self.slots.len() - 1)
            }
        }
    }

    /// Re-insert a ray at its old handle if the slot is still free (undo of
    /// a deletion); falls back to a fresh slot otherwise.
    pub fn restore(&mut self, id: RayId, ray: Ray) -> RayId {
        if id.0 < self.slots.len() && self.slots[id.0].is_none() {
            self.free.retain(|&i| i != id.0);
            self.slots[id.0] = Some(ray);
            id
        } else {
            self.insert(ray)
        }
    }

    pub fn get(&self, id: RayId) -> Option<&Ray> {
        self.slots.get(id.0).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: RayId) -> Option<&mut Ray> {
        self.slots.get_mut(id.0).and_then(|s| s.as_mut())
    }

    pub fn contains(&self, id: RayId) -> bool {
        self.get(id).is_some()
    }

    /// Live rays in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (RayId, &Ray)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|r| (RayId(i), r)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Remove every descendant of `id`, leaving the ray itself in place.
    pub fn remove_descendants(&mut self, id: RayId) {
        let children = match self.get_mut(id) {
            Some(ray) => std::mem::take(&mut ray.children),
            None => return,
        };
        for child in children {
            self.remove_descendants(child);
            self.release(child);
        }
    }

    /// Remove a ray and its whole subtree, detaching it from its parent.
    pub fn remove_recursive(&mut self, id: RayId) -> Option<Ray> {
        let parent = self.get(id)?.parent;
        if let Some(parent) = parent {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        self.remove_descendants(id);
        self.release(id)
    }

    fn release(&mut self, id: RayId) -> Option<Ray> {
        let ray = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(ray)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Ray {
        Ray::root(Vec2::ZERO, 0.0, 1.0, vec![1.03])
    }

    #[test]
    fn test_spectrum_colors_match_wavelength_count() {
        let ray = Ray::root(Vec2::ZERO, 0.0, 1.0, vec![0.4, 0.5, 0.6]);
        assert_eq!(ray.colors.len(), ray.wavelengths.len());
    }

    #[test]
    fn test_set_length() {
        let mut ray = root();
        ray.set_length(5000.0);
        assert!((ray.length() - 5000.0).abs() < 1e-9);
        // Direction unchanged.
        assert!(ray.p2.x > 0.0 && ray.p2.y == 0.0);
    }

    #[test]
    fn test_remove_recursive_detaches_subtree() {
        let mut arena = RayArena::new();
        let a = arena.insert(root());
        let b = arena.insert(Ray::child(
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            100.0,
            0.5,
            1.03,
            Color::spectrum(1)[0],
            false,
            a,
        ));
        arena.get_mut(a).unwrap().children.push(b);
        let c = arena.insert(Ray::child(
            Vec2::ZERO,
            Vec2::new(0.0, 1.0),
            100.0,
            0.25,
            1.03,
            Color::spectrum(1)[0],
            false,
            b,
        ));
        arena.get_mut(b).unwrap().children.push(c);

        arena.remove_recursive(b);
        assert!(arena.contains(a));
        assert!(!arena.contains(b));
        assert!(!arena.contains(c));
        assert!(arena.get(a).unwrap().children.is_empty());
    }

    #[test]
    fn test_remove_descendants_keeps_root() {
        let mut arena = RayArena::new();
        let a = arena.insert(root());
        let b = arena.insert(Ray::child(
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            100.0,
            0.5,
            1.03,
            Color::spectrum(1)[0],
            false,
            a,
        ));
        arena.get_mut(a).unwrap().children.push(b);

        arena.remove_descendants(a);
        assert!(arena.contains(a));
        assert!(!arena.contains(b));
    }
}
