//! Optical elements and their intersection protocol.
//!
//! An [`Element`] is a positioned, rotated shape built from a handful of
//! [`Surface`]s. The variant hierarchy is composition, not inheritance: a
//! mirror and a beam block are the lens shape with different interface
//! coefficients, so [`ElementKind::Mirror`] and [`ElementKind::BeamBlock`]
//! share [`LensParams`] and the lens surface-building code.
//!
//! All intersection work happens in the element's local (unrotated,
//! untranslated) frame; callers map ray endpoints through
//! [`Element::frame`] first.

use beamtrace_geometry::{
    cross, distance, dot, line_circle, line_line, normal_dir, normalize, Aabb, Frame, Vec2,
};
use beamtrace_materials::Material;

use crate::interface::{Hit, Interface, Surface, SurfacePath};
use crate::ray::RayId;

/// Margin added around an element's bounding region for broad-phase tests.
const BOUNDS_MARGIN: f64 = 10.0;

/// Stable handle to an element in a scene. Element slots are never reused,
/// so a handle stays unambiguous across undo/redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) usize);

/// Shape parameters shared by lens, mirror, and beam block.
///
/// `r1`/`r2` are the radii of curvature of the +x and −x faces; `None`
/// means a flat face. A finite radius must have magnitude at least half the
/// element height — degenerate curvature is clamped to that minimum when the
/// surfaces are rebuilt, never rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensParams {
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    pub thickness: f64,
    pub height: f64,
    pub ref1: f64,
    pub tran1: f64,
    pub ref2: f64,
    pub tran2: f64,
}

/// Shape parameters for a prism. Apex angle is in degrees, in (0°, 180°).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrismParams {
    pub base: f64,
    pub apex_deg: f64,
}

/// Shape parameters for a transmission grating. Line density is lines/mm,
/// strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GratingParams {
    pub lines: f64,
    pub height: f64,
    pub thickness: f64,
}

/// The element variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementKind {
    Lens(LensParams),
    Mirror(LensParams),
    BeamBlock(LensParams),
    Prism(PrismParams),
    Grating(GratingParams),
}

/// A positioned, rotated optical element.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub position: Vec2,
    pub rotation_deg: f64,
    pub material: Material,
    surfaces: Vec<Surface>,
    /// Rays known to touch this element in the current recompute; cleared at
    /// every reset and used to cascade ray invalidation on removal.
    pub(crate) rays: Vec<RayId>,
}

impl Element {
    pub fn new(kind: ElementKind, material: Material) -> Self {
        let mut element = Self {
            kind,
            position: Vec2::ZERO,
            rotation_deg: 0.0,
            material,
            surfaces: Vec::new(),
            rays: Vec::new(),
        };
        element.rebuild_surfaces();
        element
    }

    /// A biconvex lens: r1 = r2 = 1000, thickness 20, height 254, fully
    /// transmissive faces.
    pub fn lens() -> Self {
        Self::new(
            ElementKind::Lens(LensParams {
                r1: Some(1000.0),
                r2: Some(1000.0),
                thickness: 20.0,
                height: 254.0,
                ref1: 0.0,
                tran1: 1.0,
                ref2: 0.0,
                tran2: 1.0,
            }),
            Material::Bk7,
        )
    }

    /// A flat mirror: both faces fully reflective.
    pub fn mirror() -> Self {
        Self::new(
            ElementKind::Mirror(LensParams {
                r1: None,
                r2: None,
                thickness: 30.0,
                height: 254.0,
                ref1: 1.0,
                tran1: 0.0,
                ref2: 1.0,
                tran2: 0.0,
            }),
            Material::Bk7,
        )
    }

    /// A beam block: the mirror shape with both coefficients zero, so it
    /// terminates rays instead of redirecting them.
    pub fn beam_block() -> Self {
        Self::new(
            ElementKind::BeamBlock(LensParams {
                r1: None,
                r2: None,
                thickness: 30.0,
                height: 254.0,
                ref1: 0.0,
                tran1: 0.0,
                ref2: 0.0,
                tran2: 0.0,
            }),
            Material::Bk7,
        )
    }

    /// An equilateral-style prism: base 100, apex 60°.
    pub fn prism() -> Self {
        Self::new(
            ElementKind::Prism(PrismParams {
                base: 100.0,
                apex_deg: 60.0,
            }),
            Material::Bk7,
        )
    }

    /// A transmission grating: 600 lines/mm, height 254, thickness 60.
    pub fn grating() -> Self {
        Self::new(
            ElementKind::Grating(GratingParams {
                lines: 600.0,
                height: 254.0,
                thickness: 60.0,
            }),
            Material::Bk7,
        )
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation_deg: f64) -> Self {
        self.rotation_deg = rotation_deg;
        self
    }

    /// The local→scene frame of this element.
    pub fn frame(&self) -> Frame {
        Frame::new(self.position, self.rotation_deg)
    }

    /// Refractive index of the element's material at a wavelength (µm).
    pub fn refractive_index(&self, wavelength_um: f64) -> f64 {
        self.material.refractive_index(wavelength_um)
    }

    /// The variant name, matching the persisted record tags.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ElementKind::Lens(_) => "LensElement",
            ElementKind::Mirror(_) => "MirrorElement",
            ElementKind::BeamBlock(_) => "BeamBlockElement",
            ElementKind::Prism(_) => "PrismElement",
            ElementKind::Grating(_) => "GratingElement",
        }
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Rebuild the surface list from the shape parameters.
    ///
    /// Must be called after any parameter mutation; degenerate lens radii are
    /// clamped here (in the stored parameters) to the minimum valid
    /// curvature `sign(r) · height/2`.
    pub fn rebuild_surfaces(&mut self) {
        self.surfaces.clear();
        match &mut self.kind {
            ElementKind::Lens(params)
            | ElementKind::Mirror(params)
            | ElementKind::BeamBlock(params) => {
                clamp_radius(&mut params.r1, params.height);
                clamp_radius(&mut params.r2, params.height);
                let params = *params;
                self.build_lens_surfaces(params);
            }
            ElementKind::Prism(params) => {
                let params = *params;
                self.build_prism_surfaces(params);
            }
            ElementKind::Grating(params) => {
                debug_assert!(params.lines > 0.0, "grating line density must be positive");
                let params = *params;
                self.build_grating_surfaces(params);
            }
        }
    }

    fn build_lens_surfaces(&mut self, p: LensParams) {
        let half_t = p.thickness / 2.0;
        let half_h = p.height / 2.0;

        // +x face
        self.push_main_face(
            p.r1,
            half_t,
            half_h,
            Vec2::new(half_t, half_h),
            Vec2::new(half_t, -half_h),
            Interface::new(p.tran1, p.ref1),
        );
        // −x face
        self.push_main_face(
            p.r2,
            -half_t,
            half_h,
            Vec2::new(-half_t, half_h),
            Vec2::new(-half_t, -half_h),
            Interface::new(p.tran2, p.ref2),
        );

        self.push_caps(half_t, half_h);
    }

    /// One main lens face: an arc when the radius is finite, a flat segment
    /// otherwise. `side` is the signed half-thickness of the face (+x face
    /// positive). A degenerate flat face (zero height) is skipped.
    fn push_main_face(
        &mut self,
        radius: Option<f64>,
        side: f64,
        half_h: f64,
        a: Vec2,
        b: Vec2,
        interface: Interface,
    ) {
        match radius {
            Some(r) => {
                let delta = sagitta_offset(r, half_h);
                // Center sits on the optical axis, pulled back from the face
                // by the sagitta offset; the sign of `side` mirrors it.
                let center = if side > 0.0 {
                    Vec2::new(side - delta, 0.0)
                } else {
                    Vec2::new(delta + side, 0.0)
                };
                self.surfaces.push(Surface {
                    path: SurfacePath::Arc {
                        center,
                        radius: r,
                        aperture: half_h,
                    },
                    interface,
                });
            }
            None => {
                // The face normal points outward: +x for the right face,
                // −x for the left, matching normal_dir's −90° convention on
                // the stored segment orientation.
                let (from, to) = if side > 0.0 { (b, a) } else { (a, b) };
                if let Ok(normal) = normal_dir(from, to) {
                    self.surfaces.push(Surface {
                        path: SurfacePath::Segment { a, b, normal },
                        interface,
                    });
                } else {
                    log::debug!("skipping degenerate flat face");
                }
            }
        }
    }

    /// Absorbing top/bottom edge caps bounding the element, so rays cannot
    /// leak out through the open ends of the main faces.
    fn push_caps(&mut self, half_t: f64, half_h: f64) {
        let top_a = Vec2::new(-half_t, half_h);
        let top_b = Vec2::new(half_t, half_h);
        if let Ok(n) = normal_dir(top_a, top_b) {
            self.surfaces.push(Surface {
                path: SurfacePath::Segment {
                    a: top_a,
                    b: top_b,
                    normal: -n,
                },
                interface: Interface::blocking(),
            });
        }

        let bot_a = Vec2::new(-half_t, -half_h);
        let bot_b = Vec2::new(half_t, -half_h);
        if let Ok(n) = normal_dir(bot_a, bot_b) {
            self.surfaces.push(Surface {
                path: SurfacePath::Segment {
                    a: bot_a,
                    b: bot_b,
                    normal: n,
                },
                interface: Interface::blocking(),
            });
        }
    }

    fn build_prism_surfaces(&mut self, p: PrismParams) {
        let apex = p.apex_deg.clamp(1e-3, 180.0 - 1e-3).to_radians();
        let circumradius = p.base / (2.0 * apex.sin());
        let h = (circumradius * circumradius - (p.base / 2.0) * (p.base / 2.0)).sqrt();

        let vertices = [
            Vec2::new(-p.base / 2.0, h),
            Vec2::new(p.base / 2.0, h),
            Vec2::new(0.0, -circumradius),
        ];

        let interface = Interface::new(0.95, 0.05);
        // Edges walked against vertex order; all share one interface.
        for (i, j) in [(0, 2), (2, 1), (1, 0)] {
            let (a, b) = (vertices[i], vertices[j]);
            if let Ok(normal) = normal_dir(a, b) {
                self.surfaces.push(Surface {
                    path: SurfacePath::Segment { a, b, normal },
                    interface,
                });
            }
        }
    }

    fn build_grating_surfaces(&mut self, p: GratingParams) {
        let half_t = p.thickness / 2.0;
        let half_h = p.height / 2.0;

        // Plain entrance face at +x.
        self.surfaces.push(Surface {
            path: SurfacePath::Segment {
                a: Vec2::new(half_t, half_h),
                b: Vec2::new(half_t, -half_h),
                normal: Vec2::new(1.0, 0.0),
            },
            interface: Interface::default(),
        });
        // Ruled face at −x carries the line density.
        self.surfaces.push(Surface {
            path: SurfacePath::Segment {
                a: Vec2::new(-half_t, half_h),
                b: Vec2::new(-half_t, -half_h),
                normal: Vec2::new(-1.0, 0.0),
            },
            interface: Interface::grating(p.lines),
        });

        self.push_caps(half_t, half_h);
    }

    /// All ray/surface intersections for the local-frame segment (p1, p2).
    ///
    /// Only hits strictly ahead of p1 are returned
    /// (`dot(p2−p1, hit−p1) > 0`), sorted ascending by distance from p1.
    /// Arc hits are cut to within half the element height of the origin.
    pub fn intersections(&self, p1: Vec2, p2: Vec2) -> Vec<Hit> {
        let mut hits = Vec::new();

        for surface in &self.surfaces {
            match surface.path {
                SurfacePath::Segment { a, b, normal } => {
                    if let Some(point) = line_line(p1, p2, a, b) {
                        hits.push(Hit {
                            point,
                            normal,
                            interface: surface.interface,
                        });
                    }
                }
                SurfacePath::Arc {
                    center,
                    radius,
                    aperture,
                } => {
                    for point in line_circle(p1, p2, center, radius) {
                        if distance(point, Vec2::ZERO) >= aperture {
                            continue;
                        }
                        if let Ok(mut normal) = normalize(point - center) {
                            if radius < 0.0 {
                                normal = -normal;
                            }
                            hits.push(Hit {
                                point,
                                normal,
                                interface: surface.interface,
                            });
                        }
                    }
                }
            }
        }

        hits.retain(|h| dot(p2 - p1, h.point - p1) > 0.0);
        hits.sort_by(|a, b| distance(p1, a.point).total_cmp(&distance(p1, b.point)));
        hits
    }

    /// Point-in-element test in the local frame, used to decide which medium
    /// a ray origin sits in.
    pub fn contains(&self, p: Vec2) -> bool {
        match self.kind {
            ElementKind::Lens(params)
            | ElementKind::Mirror(params)
            | ElementKind::BeamBlock(params) => {
                let half_t = params.thickness / 2.0;
                let half_h = params.height / 2.0;
                if p.y.abs() > half_h {
                    return false;
                }
                face_side_ok(p, params.r1, half_t, half_h, 1.0)
                    && face_side_ok(p, params.r2, half_t, half_h, -1.0)
            }
            ElementKind::Prism(_) => {
                // Inside iff p is on a consistent side of every edge.
                let edges: Vec<(Vec2, Vec2)> = self
                    .surfaces
                    .iter()
                    .filter_map(|s| match s.path {
                        SurfacePath::Segment { a, b, .. } => Some((a, b)),
                        SurfacePath::Arc { .. } => None,
                    })
                    .collect();
                let mut pos = true;
                let mut neg = true;
                for (a, b) in edges {
                    let side = cross(b - a, p - a);
                    pos &= side >= 0.0;
                    neg &= side <= 0.0;
                }
                pos || neg
            }
            ElementKind::Grating(params) => {
                p.x.abs() <= params.thickness / 2.0 && p.y.abs() <= params.height / 2.0
            }
        }
    }

    /// Conservative bounding box in the local frame.
    pub fn local_bounds(&self) -> Aabb {
        let mut points = Vec::new();
        for surface in &self.surfaces {
            match surface.path {
                SurfacePath::Segment { a, b, .. } => {
                    points.push(a);
                    points.push(b);
                }
                SurfacePath::Arc {
                    center,
                    radius,
                    aperture,
                } => {
                    let r = radius.abs();
                    points.push(Vec2::new(center.x - r, -aperture));
                    points.push(Vec2::new(center.x + r, aperture));
                }
            }
        }
        Aabb::from_points(points).unwrap_or(Aabb::new(Vec2::ZERO, Vec2::ZERO))
    }

    /// Bounding box in scene coordinates, padded by the broad-phase margin.
    pub fn scene_bounds(&self) -> Aabb {
        let local = self.local_bounds();
        let frame = self.frame();
        let corners = [
            Vec2::new(local.min.x, local.min.y),
            Vec2::new(local.min.x, local.max.y),
            Vec2::new(local.max.x, local.min.y),
            Vec2::new(local.max.x, local.max.y),
        ];
        Aabb::from_points(corners.map(|c| frame.to_scene(c)))
            .unwrap_or(Aabb::new(self.position, self.position))
            .expanded(BOUNDS_MARGIN)
    }
}

/// Clamp a finite radius whose magnitude has fallen below half the height to
/// the minimum valid curvature, keeping its sign.
fn clamp_radius(radius: &mut Option<f64>, height: f64) {
    if let Some(r) = radius {
        let min = height / 2.0;
        if r.abs() < min {
            *radius = Some(r.signum() * min);
        }
    }
}

/// Axial distance from an arc face's circle center to the face plane:
/// `r · cos(asin(h / 2r))`. Negative for a negative radius.
fn sagitta_offset(radius: f64, half_h: f64) -> f64 {
    radius * (half_h / radius).asin().cos()
}

/// Is `p` on the material side of one main lens face? `sign` is +1 for the
/// +x face, −1 for the −x face.
fn face_side_ok(p: Vec2, radius: Option<f64>, half_t: f64, half_h: f64, sign: f64) -> bool {
    let within_slab = p.x * sign <= half_t;
    match radius {
        None => within_slab,
        Some(r) => {
            let delta = sagitta_offset(r, half_h);
            let center = Vec2::new(sign * (half_t - delta), 0.0);
            if r > 0.0 {
                // Convex face: the slab plus the spherical cap beyond it.
                within_slab || distance(p, center) <= r
            } else {
                // Concave face: the slab minus the circle's bite.
                within_slab && distance(p, center) >= -r
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_only_hits() {
        // A circle entirely behind the ray origin yields nothing.
        let mut el = Element::lens();
        if let ElementKind::Lens(p) = &mut el.kind {
            p.r1 = Some(200.0);
            p.r2 = Some(200.0);
        }
        el.rebuild_surfaces();
        let hits = el.intersections(Vec2::new(500.0, 0.0), Vec2::new(501.0, 0.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_lens_hits_sorted_by_distance() {
        let el = Element::lens();
        let hits = el.intersections(Vec2::new(-500.0, 0.0), Vec2::new(500.0, 0.0));
        assert_eq!(hits.len(), 2);
        for pair in hits.windows(2) {
            assert!(
                distance(Vec2::new(-500.0, 0.0), pair[0].point)
                    <= distance(Vec2::new(-500.0, 0.0), pair[1].point)
            );
        }
        // First hit is the −x face, normal pointing −x.
        assert!(hits[0].point.x < 0.0);
        assert!(hits[0].normal.x < 0.0);
    }

    #[test]
    fn test_flat_mirror_hit_normal() {
        let el = Element::mirror();
        let hits = el.intersections(Vec2::new(-500.0, 0.0), Vec2::new(500.0, 0.0));
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].point.x, -15.0);
        assert_relative_eq!(hits[0].normal.x, -1.0);
        assert_relative_eq!(hits[1].point.x, 15.0);
        assert_relative_eq!(hits[1].normal.x, 1.0);
    }

    #[test]
    fn test_edge_caps_absorb() {
        // A vertical ray through the lens body hits the absorbing caps.
        let el = Element::mirror();
        let hits = el.intersections(Vec2::new(0.0, -500.0), Vec2::new(0.0, 500.0));
        assert_eq!(hits.len(), 2);
        assert!(hits
            .iter()
            .all(|h| h.interface.transmittance == 0.0 && h.interface.reflectance == 0.0));
    }

    #[test]
    fn test_degenerate_radius_clamped() {
        let mut el = Element::lens();
        if let ElementKind::Lens(p) = &mut el.kind {
            p.r1 = Some(10.0); // far below height/2 = 127
            p.r2 = Some(-50.0);
        }
        el.rebuild_surfaces();
        if let ElementKind::Lens(p) = el.kind {
            assert_relative_eq!(p.r1.unwrap(), 127.0);
            assert_relative_eq!(p.r2.unwrap(), -127.0);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_prism_three_edges() {
        let el = Element::prism();
        assert_eq!(el.surfaces().len(), 3);
        // A horizontal ray through the centroid crosses two edges.
        let hits = el.intersections(Vec2::new(-500.0, 10.0), Vec2::new(500.0, 10.0));
        assert_eq!(hits.len(), 2);
        assert!(hits
            .iter()
            .all(|h| h.interface.transmittance == 0.95 && h.interface.reflectance == 0.05));
    }

    #[test]
    fn test_prism_contains_centroid() {
        let el = Element::prism();
        if let ElementKind::Prism(p) = el.kind {
            let r = p.base / (2.0 * p.apex_deg.to_radians().sin());
            let h = (r * r - (p.base / 2.0).powi(2)).sqrt();
            let centroid = Vec2::new(0.0, (2.0 * h - r) / 3.0);
            assert!(el.contains(centroid));
        }
        assert!(!el.contains(Vec2::new(1000.0, 0.0)));
    }

    #[test]
    fn test_lens_contains() {
        let el = Element::lens();
        assert!(el.contains(Vec2::ZERO));
        assert!(!el.contains(Vec2::new(0.0, 200.0)));
        assert!(!el.contains(Vec2::new(100.0, 0.0)));
        // Inside the convex cap just beyond the face plane.
        assert!(el.contains(Vec2::new(12.0, 0.0)));
    }

    #[test]
    fn test_grating_faces() {
        let el = Element::grating();
        let hits = el.intersections(Vec2::new(-500.0, 0.0), Vec2::new(500.0, 0.0));
        assert_eq!(hits.len(), 2);
        // The −x face carries the line density.
        assert_eq!(hits[0].interface.line_density, Some(600.0));
        assert_eq!(hits[1].interface.line_density, None);
    }

    #[test]
    fn test_scene_bounds_follow_position() {
        let el = Element::mirror().with_position(Vec2::new(300.0, 0.0));
        let bb = el.scene_bounds();
        assert!(bb.min.x > 200.0 && bb.max.x < 400.0);
        assert!(bb.intersects_segment(Vec2::new(0.0, 0.0), Vec2::new(1000.0, 0.0)));
    }
}
