//! The material catalog and its closed-form dispersion formulas.
//!
//! Glass entries use the three-term Sellmeier equation
//! $n^2(\lambda) = 1 + \sum_i B_i \lambda^2 / (\lambda^2 - C_i)$ with
//! coefficients from the manufacturer datasheets; air uses the two-term
//! Ciddor form. Wavelengths are in micrometres throughout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from catalog lookups.
#[derive(Debug, Error, PartialEq)]
pub enum MaterialError {
    #[error("Material {0} not found in catalog")]
    UnknownMaterial(String),
}

/// A catalog material with a closed-form dispersion function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    /// Fused silica.
    FusedSilica,
    /// Schott N-BK7 borosilicate crown glass.
    Bk7,
    /// Schott SF10 dense flint glass.
    Sf10,
    /// Calcium fluoride.
    CaF2,
    /// Air at standard conditions.
    Air,
}

impl Material {
    /// All catalog identifiers, in catalog order.
    pub const NAMES: [&'static str; 5] = ["FS", "BK7", "SF10", "CaF2", "Air"];

    /// Resolve a material by its catalog identifier.
    pub fn from_name(name: &str) -> Result<Self, MaterialError> {
        match name {
            "FS" => Ok(Self::FusedSilica),
            "BK7" => Ok(Self::Bk7),
            "SF10" => Ok(Self::Sf10),
            "CaF2" => Ok(Self::CaF2),
            "Air" => Ok(Self::Air),
            other => Err(MaterialError::UnknownMaterial(other.to_string())),
        }
    }

    /// The catalog identifier of this material.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FusedSilica => "FS",
            Self::Bk7 => "BK7",
            Self::Sf10 => "SF10",
            Self::CaF2 => "CaF2",
            Self::Air => "Air",
        }
    }

    /// Refractive index at a wavelength in micrometres.
    ///
    /// Valid over the practical UV–IR range [0.2, 20] µm; the closed forms
    /// are trusted, not validated here.
    pub fn refractive_index(&self, wavelength_um: f64) -> f64 {
        let x = wavelength_um;
        match self {
            Self::FusedSilica => (1.0
                + 0.696_166_3 / (1.0 - (0.068_404_3 / x).powi(2))
                + 0.407_942_6 / (1.0 - (0.116_241_4 / x).powi(2))
                + 0.897_479_4 / (1.0 - (9.896_161 / x).powi(2)))
            .sqrt(),
            Self::Bk7 => (1.0
                + 1.039_612_12 / (1.0 - 0.006_000_698_67 / x.powi(2))
                + 0.231_792_344 / (1.0 - 0.020_017_914_4 / x.powi(2))
                + 1.010_469_45 / (1.0 - 103.560_653 / x.powi(2)))
            .sqrt(),
            Self::Sf10 => (1.0
                + 1.621_539_02 / (1.0 - 0.012_224_145_7 / x.powi(2))
                + 0.256_287_842 / (1.0 - 0.059_573_677_5 / x.powi(2))
                + 1.644_475_52 / (1.0 - 147.468_793 / x.powi(2)))
            .sqrt(),
            Self::CaF2 => (1.0
                + 0.567_588_8 / (1.0 - (0.050_263_605 / x).powi(2))
                + 0.471_091_4 / (1.0 - (0.100_390_9 / x).powi(2))
                + 3.848_472_3 / (1.0 - (34.649_040 / x).powi(2)))
            .sqrt(),
            Self::Air => {
                1.0 + 0.057_921_05 / (238.018_5 - x.powi(-2))
                    + 0.001_679_17 / (57.362 - x.powi(-2))
            }
        }
    }
}
