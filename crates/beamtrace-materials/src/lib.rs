//! # Beamtrace Materials
//!
//! Dispersion model for the beamtrace ray tracer: a static catalog of named
//! materials, each a closed-form refractive-index function of wavelength.
//!
//! ## Available materials
//!
//! | Identifier | Material | Formula |
//! |-----------|----------|---------|
//! | `FS` | Fused silica | Sellmeier (Malitson 1965) |
//! | `BK7` | Schott N-BK7 borosilicate | Sellmeier |
//! | `SF10` | Schott SF10 dense flint | Sellmeier |
//! | `CaF2` | Calcium fluoride | Sellmeier |
//! | `Air` | Air at standard conditions | Cauchy-style (Ciddor) |
//!
//! Formulas are evaluated directly; they are physically plausible over the
//! practical UV–IR range [0.2, 20] µm used by the optical elements, and the
//! catalog is trusted rather than validated at evaluation time.

pub mod catalog;

pub use catalog::{Material, MaterialError};
