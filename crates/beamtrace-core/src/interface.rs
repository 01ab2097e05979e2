//! Interfaces: the optical attributes of an element's surface segments.
//!
//! Every surface of an element carries an [`Interface`]: a transmittance, a
//! reflectance, and optionally a grating line density. An element rebuilds
//! its surfaces (geometry + interface) whenever a shape parameter changes;
//! surfaces are never shared between elements.

use beamtrace_geometry::Vec2;

/// Optical attributes of one surface.
///
/// Transmittance and reflectance are not required to sum to 1 — the missing
/// fraction is implicit, unmodeled absorption. This is an inherited
/// approximation of the model, not something to normalize away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interface {
    /// Fraction of intensity transmitted through the surface, in [0, 1].
    pub transmittance: f64,
    /// Fraction of intensity reflected off the surface, in [0, 1].
    pub reflectance: f64,
    /// Grating line density in lines/mm; `Some` marks this surface as a
    /// diffraction grating rather than a plain refractive surface.
    pub line_density: Option<f64>,
}

impl Interface {
    /// A plain refractive surface.
    pub const fn new(transmittance: f64, reflectance: f64) -> Self {
        Self {
            transmittance,
            reflectance,
            line_density: None,
        }
    }

    /// A dispersive grating surface with the given line density (lines/mm).
    pub const fn grating(line_density: f64) -> Self {
        Self {
            transmittance: 1.0,
            reflectance: 0.0,
            line_density: Some(line_density),
        }
    }

    /// An absorbing surface: terminates any ray that hits it.
    pub const fn blocking() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Default for Interface {
    /// Fully transmissive, matching a bare surface.
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

/// Geometry of one surface in the element's local frame.
#[derive(Debug, Clone, Copy)]
pub enum SurfacePath {
    /// A flat face or polygon edge, with its unit normal precomputed in the
    /// element's orientation convention.
    Segment { a: Vec2, b: Vec2, normal: Vec2 },
    /// A circular arc cut to `aperture` distance from the element origin.
    /// A negative radius flips the surface normal (concave face).
    Arc {
        center: Vec2,
        radius: f64,
        aperture: f64,
    },
}

/// One surface of an element: local-frame geometry plus optical attributes.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    pub path: SurfacePath,
    pub interface: Interface,
}

/// A ray/surface intersection in the element's local frame.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    /// Intersection point.
    pub point: Vec2,
    /// Unit surface normal at the intersection.
    pub normal: Vec2,
    /// Attributes of the surface that was hit.
    pub interface: Interface,
}
