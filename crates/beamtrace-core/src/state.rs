//! Persisted scene state.
//!
//! A scene file is a JSON array of [`SceneRecord`]s, one per element plus
//! one per root ray (derived rays are recomputed on load, never stored).
//! Records are tagged with the element type name and tolerate missing
//! fields: older files omit coefficients on lenses and thickness on
//! mirrors, so those fall back to the constructor defaults.

use beamtrace_geometry::Vec2;
use beamtrace_materials::{Material, MaterialError};
use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind, GratingParams, LensParams, PrismParams};
use crate::ray::{Color, Ray};

fn default_zero() -> f64 {
    0.0
}

fn default_one() -> f64 {
    1.0
}

fn default_lens_thickness() -> f64 {
    20.0
}

fn default_mirror_thickness() -> f64 {
    30.0
}

fn default_material() -> String {
    "BK7".to_owned()
}

/// One persisted scene item, tagged by element type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SceneRecord {
    #[serde(rename = "LensElement")]
    Lens(LensRecord),
    #[serde(rename = "MirrorElement")]
    Mirror(MirrorRecord),
    #[serde(rename = "BeamBlockElement")]
    BeamBlock(BeamBlockRecord),
    #[serde(rename = "PrismElement")]
    Prism(PrismRecord),
    #[serde(rename = "GratingElement")]
    Grating(GratingRecord),
    #[serde(rename = "RayElement")]
    Ray(RayRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LensRecord {
    pub pos: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_material")]
    pub mat: String,
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    #[serde(default = "default_lens_thickness")]
    pub thickness: f64,
    pub height: f64,
    #[serde(default = "default_zero")]
    pub ref1: f64,
    #[serde(default = "default_one")]
    pub tran1: f64,
    #[serde(default = "default_zero")]
    pub ref2: f64,
    #[serde(default = "default_one")]
    pub tran2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub pos: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_material")]
    pub mat: String,
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    #[serde(default = "default_mirror_thickness")]
    pub thickness: f64,
    pub height: f64,
    #[serde(default = "default_one")]
    pub ref1: f64,
    #[serde(default = "default_zero")]
    pub tran1: f64,
    #[serde(default = "default_one")]
    pub ref2: f64,
    #[serde(default = "default_zero")]
    pub tran2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamBlockRecord {
    pub pos: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_material")]
    pub mat: String,
    #[serde(default)]
    pub r1: Option<f64>,
    #[serde(default)]
    pub r2: Option<f64>,
    #[serde(default = "default_mirror_thickness")]
    pub thickness: f64,
    pub height: f64,
    #[serde(default = "default_zero")]
    pub ref1: f64,
    #[serde(default = "default_zero")]
    pub tran1: f64,
    #[serde(default = "default_zero")]
    pub ref2: f64,
    #[serde(default = "default_zero")]
    pub tran2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrismRecord {
    pub pos: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_material")]
    pub mat: String,
    pub base: f64,
    pub apex: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GratingRecord {
    pub pos: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_material")]
    pub mat: String,
    pub lines: f64,
    pub height: f64,
    pub thickness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RayRecord {
    pub pos: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_one")]
    pub intensity: f64,
    pub wl: Vec<f64>,
    #[serde(default)]
    pub arrows: bool,
    #[serde(default)]
    pub color: Option<Vec<Color>>,
}

/// A scene item rebuilt from its record.
#[derive(Debug)]
pub enum SceneItem {
    Element(Element),
    Ray(Ray),
}

impl SceneRecord {
    pub fn from_element(element: &Element) -> Self {
        let pos = [element.position.x, element.position.y];
        let rot = element.rotation_deg;
        let mat = element.material.name().to_owned();
        match element.kind {
            ElementKind::Lens(p) => SceneRecord::Lens(LensRecord {
                pos,
                rot,
                mat,
                r1: p.r1,
                r2: p.r2,
                thickness: p.thickness,
                height: p.height,
                ref1: p.ref1,
                tran1: p.tran1,
                ref2: p.ref2,
                tran2: p.tran2,
            }),
            ElementKind::Mirror(p) => SceneRecord::Mirror(MirrorRecord {
                pos,
                rot,
                mat,
                r1: p.r1,
                r2: p.r2,
                thickness: p.thickness,
                height: p.height,
                ref1: p.ref1,
                tran1: p.tran1,
                ref2: p.ref2,
                tran2: p.tran2,
            }),
            ElementKind::BeamBlock(p) => SceneRecord::BeamBlock(BeamBlockRecord {
                pos,
                rot,
                mat,
                r1: p.r1,
                r2: p.r2,
                thickness: p.thickness,
                height: p.height,
                ref1: p.ref1,
                tran1: p.tran1,
                ref2: p.ref2,
                tran2: p.tran2,
            }),
            ElementKind::Prism(p) => SceneRecord::Prism(PrismRecord {
                pos,
                rot,
                mat,
                base: p.base,
                apex: p.apex_deg,
            }),
            ElementKind::Grating(p) => SceneRecord::Grating(GratingRecord {
                pos,
                rot,
                mat,
                lines: p.lines,
                height: p.height,
                thickness: p.thickness,
            }),
        }
    }

    /// Record for a root ray. Derived rays are not persisted.
    pub fn from_ray(ray: &Ray) -> Self {
        SceneRecord::Ray(RayRecord {
            pos: [ray.position.x, ray.position.y],
            rot: ray.rotation_deg,
            intensity: ray.intensity,
            wl: ray.wavelengths.clone(),
            arrows: ray.show_arrow,
            color: Some(ray.colors.clone()),
        })
    }

    /// Rebuild the scene item this record describes.
    pub fn instantiate(&self) -> Result<SceneItem, MaterialError> {
        let item = match self {
            SceneRecord::Lens(r) => SceneItem::Element(
                Element::new(
                    ElementKind::Lens(LensParams {
                        r1: r.r1,
                        r2: r.r2,
                        thickness: r.thickness,
                        height: r.height,
                        ref1: r.ref1,
                        tran1: r.tran1,
                        ref2: r.ref2,
                        tran2: r.tran2,
                    }),
                    Material::from_name(&r.mat)?,
                )
                .with_position(Vec2::new(r.pos[0], r.pos[1]))
                .with_rotation(r.rot),
            ),
            SceneRecord::Mirror(r) => SceneItem::Element(
                Element::new(
                    ElementKind::Mirror(LensParams {
                        r1: r.r1,
                        r2: r.r2,
                        thickness: r.thickness,
                        height: r.height,
                        ref1: r.ref1,
                        tran1: r.tran1,
                        ref2: r.ref2,
                        tran2: r.tran2,
                    }),
                    Material::from_name(&r.mat)?,
                )
                .with_position(Vec2::new(r.pos[0], r.pos[1]))
                .with_rotation(r.rot),
            ),
            SceneRecord::BeamBlock(r) => SceneItem::Element(
                Element::new(
                    ElementKind::BeamBlock(LensParams {
                        r1: r.r1,
                        r2: r.r2,
                        thickness: r.thickness,
                        height: r.height,
                        ref1: r.ref1,
                        tran1: r.tran1,
                        ref2: r.ref2,
                        tran2: r.tran2,
                    }),
                    Material::from_name(&r.mat)?,
                )
                .with_position(Vec2::new(r.pos[0], r.pos[1]))
                .with_rotation(r.rot),
            ),
            SceneRecord::Prism(r) => SceneItem::Element(
                Element::new(
                    ElementKind::Prism(PrismParams {
                        base: r.base,
                        apex_deg: r.apex,
                    }),
                    Material::from_name(&r.mat)?,
                )
                .with_position(Vec2::new(r.pos[0], r.pos[1]))
                .with_rotation(r.rot),
            ),
            SceneRecord::Grating(r) => SceneItem::Element(
                Element::new(
                    ElementKind::Grating(GratingParams {
                        lines: r.lines,
                        height: r.height,
                        thickness: r.thickness,
                    }),
                    Material::from_name(&r.mat)?,
                )
                .with_position(Vec2::new(r.pos[0], r.pos[1]))
                .with_rotation(r.rot),
            ),
            SceneRecord::Ray(r) => {
                let mut ray = Ray::root(
                    Vec2::new(r.pos[0], r.pos[1]),
                    r.rot,
                    r.intensity,
                    r.wl.clone(),
                );
                ray.show_arrow = r.arrows;
                if let Some(colors) = &r.color {
                    if colors.len() == ray.wavelengths.len() {
                        ray.colors = colors.clone();
                    }
                }
                SceneItem::Ray(ray)
            }
        };
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lens_round_trip() {
        let mut lens = Element::lens()
            .with_position(Vec2::new(100.0, -25.0))
            .with_rotation(15.0);
        lens.material = Material::Sf10;
        let record = SceneRecord::from_element(&lens);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"LensElement\""));

        let back: SceneRecord = serde_json::from_str(&json).unwrap();
        match back.instantiate().unwrap() {
            SceneItem::Element(el) => {
                assert_eq!(el.kind, lens.kind);
                assert_eq!(el.material, Material::Sf10);
                assert_relative_eq!(el.position.x, 100.0);
                assert_relative_eq!(el.rotation_deg, 15.0);
            }
            SceneItem::Ray(_) => panic!("expected an element"),
        }
    }

    #[test]
    fn test_mirror_round_trip() {
        let mut mirror = Element::mirror()
            .with_position(Vec2::new(-50.0, 300.0))
            .with_rotation(45.0);
        if let ElementKind::Mirror(p) = &mut mirror.kind {
            p.r1 = Some(2000.0);
            p.ref2 = 0.3;
            p.tran2 = 0.7;
        }
        mirror.rebuild_surfaces();
        let record = SceneRecord::from_element(&mirror);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"MirrorElement\""));

        let back: SceneRecord = serde_json::from_str(&json).unwrap();
        match back.instantiate().unwrap() {
            SceneItem::Element(el) => {
                assert_relative_eq!(el.position.x, -50.0);
                assert_relative_eq!(el.position.y, 300.0);
                assert_relative_eq!(el.rotation_deg, 45.0);
                match el.kind {
                    ElementKind::Mirror(p) => {
                        assert_eq!(p.r1, Some(2000.0));
                        assert_eq!(p.r2, None);
                        assert_relative_eq!(p.thickness, 30.0);
                        assert_relative_eq!(p.height, 254.0);
                        assert_relative_eq!(p.ref1, 1.0);
                        assert_relative_eq!(p.tran1, 0.0);
                        assert_relative_eq!(p.ref2, 0.3);
                        assert_relative_eq!(p.tran2, 0.7);
                    }
                    other => panic!("unexpected kind: {other:?}"),
                }
            }
            SceneItem::Ray(_) => panic!("expected an element"),
        }
    }

    #[test]
    fn test_beam_block_round_trip() {
        let block = Element::beam_block()
            .with_position(Vec2::new(800.0, -10.0))
            .with_rotation(-30.0);
        let record = SceneRecord::from_element(&block);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"BeamBlockElement\""));

        let back: SceneRecord = serde_json::from_str(&json).unwrap();
        match back.instantiate().unwrap() {
            SceneItem::Element(el) => {
                assert_relative_eq!(el.position.x, 800.0);
                assert_relative_eq!(el.position.y, -10.0);
                assert_relative_eq!(el.rotation_deg, -30.0);
                match el.kind {
                    ElementKind::BeamBlock(p) => {
                        assert_eq!(p.r1, None);
                        assert_eq!(p.r2, None);
                        assert_relative_eq!(p.thickness, 30.0);
                        assert_relative_eq!(p.height, 254.0);
                        assert_relative_eq!(p.ref1, 0.0);
                        assert_relative_eq!(p.tran1, 0.0);
                        assert_relative_eq!(p.ref2, 0.0);
                        assert_relative_eq!(p.tran2, 0.0);
                    }
                    other => panic!("unexpected kind: {other:?}"),
                }
            }
            SceneItem::Ray(_) => panic!("expected an element"),
        }
    }

    #[test]
    fn test_lens_record_without_coefficients_uses_defaults() {
        let json = r#"{
            "type": "LensElement",
            "pos": [0.0, 0.0],
            "rot": 0.0,
            "mat": "FS",
            "r1": 1000.0,
            "r2": null,
            "thickness": 20.0,
            "height": 254.0
        }"#;
        let record: SceneRecord = serde_json::from_str(json).unwrap();
        match record.instantiate().unwrap() {
            SceneItem::Element(el) => match el.kind {
                ElementKind::Lens(p) => {
                    assert_eq!(p.r2, None);
                    assert_relative_eq!(p.tran1, 1.0);
                    assert_relative_eq!(p.ref1, 0.0);
                }
                other => panic!("unexpected kind: {other:?}"),
            },
            SceneItem::Ray(_) => panic!("expected an element"),
        }
    }

    #[test]
    fn test_mirror_record_without_thickness_uses_default() {
        let json = r#"{
            "type": "MirrorElement",
            "pos": [300.0, 0.0],
            "rot": 45.0,
            "mat": "BK7",
            "r1": null,
            "r2": null,
            "height": 254.0,
            "ref1": 1.0, "tran1": 0.0, "ref2": 1.0, "tran2": 0.0
        }"#;
        let record: SceneRecord = serde_json::from_str(json).unwrap();
        match record.instantiate().unwrap() {
            SceneItem::Element(el) => match el.kind {
                ElementKind::Mirror(p) => assert_relative_eq!(p.thickness, 30.0),
                other => panic!("unexpected kind: {other:?}"),
            },
            SceneItem::Ray(_) => panic!("expected an element"),
        }
    }

    #[test]
    fn test_ray_round_trip() {
        let mut ray = Ray::root(Vec2::new(-400.0, 10.0), 5.0, 0.8, vec![0.4, 0.7, 1.03]);
        ray.show_arrow = true;
        let record = SceneRecord::from_ray(&ray);
        let json = serde_json::to_string(&record).unwrap();
        let back: SceneRecord = serde_json::from_str(&json).unwrap();
        match back.instantiate().unwrap() {
            SceneItem::Ray(r) => {
                assert_eq!(r.wavelengths, ray.wavelengths);
                assert_eq!(r.colors.len(), 3);
                assert!(r.show_arrow);
                assert!(r.is_root());
                assert_relative_eq!(r.intensity, 0.8);
            }
            SceneItem::Element(_) => panic!("expected a ray"),
        }
    }

    #[test]
    fn test_prism_and_grating_tags() {
        let prism = SceneRecord::from_element(&Element::prism());
        let grating = SceneRecord::from_element(&Element::grating());
        assert!(serde_json::to_string(&prism)
            .unwrap()
            .contains("\"type\":\"PrismElement\""));
        assert!(serde_json::to_string(&grating)
            .unwrap()
            .contains("\"type\":\"GratingElement\""));
    }

    #[test]
    fn test_unknown_material_is_an_error() {
        let json = r#"{
            "type": "PrismElement",
            "pos": [0.0, 0.0],
            "mat": "unobtainium",
            "base": 100.0,
            "apex": 60.0
        }"#;
        let record: SceneRecord = serde_json::from_str(json).unwrap();
        assert!(record.instantiate().is_err());
    }
}
