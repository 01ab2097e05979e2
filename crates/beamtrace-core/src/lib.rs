//! # Beamtrace Core
//!
//! The scene model and ray-propagation engine of the beamtrace 2D ray
//! tracer. A [`scene::Scene`] owns a set of positioned, rotated
//! [`element::Element`]s (lenses, mirrors, prisms, gratings, beam blocks)
//! and a tree of [`ray::Ray`]s; [`scene::Scene::calculate`] iteratively
//! intersects every unhandled ray with the element surfaces and spawns
//! refracted/reflected child rays until energy starves below the intensity
//! threshold or the pass cap binds.
//!
//! ## Modules
//!
//! - [`interface`] — surface segments with reflectance/transmittance/grating
//!   attributes.
//! - [`element`] — element variants and their intersection protocol.
//! - [`ray`] — the ray tree and its arena storage.
//! - [`scene`] — the scene context, mutation API, and propagation engine.
//! - [`history`] — the undo/redo log.
//! - [`state`] — round-trippable persisted records for elements and rays.

pub mod element;
pub mod history;
pub mod interface;
pub mod ray;
pub mod scene;
pub mod state;

pub use element::{Element, ElementId, ElementKind};
pub use interface::{Hit, Interface};
pub use ray::{Ray, RayId};
pub use scene::{Scene, SceneError, TraceStats};
pub use state::SceneRecord;
