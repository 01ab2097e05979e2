//! The scene: element and ray storage, mutations, undo, and the
//! propagation engine.
//!
//! A [`Scene`] owns an element arena and a ray arena plus the undo log.
//! Every mutation (add/remove/set parameter/undo) records history and ends
//! with a full [`Scene::calculate`] recompute, so derived rays never
//! outlive the geometry that produced them. Recompute-from-scratch keeps
//! the mutations trivially correct at the cost of redoing unaffected rays,
//! which is cheap at these scene sizes. Bulk loading is the one exception:
//! [`Scene::load_records`] inserts everything first and leaves the single
//! recompute to the caller.

use beamtrace_geometry::{distance, dot, rotate, signed_angle, Aabb, Vec2};
use beamtrace_materials::MaterialError;
use thiserror::Error;

use crate::element::{Element, ElementId};
use crate::history::{History, HistoryEntry};
use crate::interface::Hit;
use crate::ray::{Ray, RayArena, RayId, DEFAULT_RAY_LENGTH};
use crate::state::{SceneItem, SceneRecord};

/// Hard cap on propagation passes; closed resonator geometries never settle.
const MAX_PASSES: u32 = 100;

/// Diffraction order used for grating surfaces.
const GRATING_ORDER: f64 = -1.0;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error("no such element (id {0})")]
    NoSuchElement(usize),
    #[error("no such ray (id {0})")]
    NoSuchRay(usize),
    #[error("element has no parameter `{0}`")]
    UnknownParam(String),
    #[error("invalid value for parameter `{param}`")]
    InvalidValue {
        param: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of one full recompute.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceStats {
    /// Propagation passes run, including the final one.
    pub passes: u32,
    /// Derived rays spawned in total.
    pub spawned: usize,
}

/// Append-only element storage. Slots are never reused, so an [`ElementId`]
/// uniquely names one element for the whole life of the scene, which is what
/// makes undo entries unambiguous.
#[derive(Debug, Default)]
pub struct ElementArena {
    slots: Vec<Option<Element>>,
}

impl ElementArena {
    pub fn insert(&mut self, element: Element) -> ElementId {
        self.slots.push(Some(element));
        ElementId(self.slots.len() - 1)
    }

    /// Put an element back at its old handle (undo of a deletion). The slot
    /// is guaranteed empty because handles are never reused.
    pub fn insert_at(&mut self, id: ElementId, element: Element) {
        if id.0 >= self.slots.len() {
            self.slots.resize_with(id.0 + 1, || None);
        }
        debug_assert!(self.slots[id.0].is_none());
        self.slots[id.0] = Some(element);
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.slots.get_mut(id.0)?.take()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.0).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots.get_mut(id.0).and_then(|s| s.as_mut())
    }

    /// Live elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|e| (ElementId(i), e)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// An optical scene.
#[derive(Debug)]
pub struct Scene {
    pub elements: ElementArena,
    pub rays: RayArena,
    history: History,
    /// Spawn threshold: a surface branch whose child intensity would not
    /// exceed this is dropped.
    pub intensity_threshold: f64,
    /// World rectangle; its diagonal is the working ray length.
    pub rect: Aabb,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            elements: ElementArena::default(),
            rays: RayArena::new(),
            history: History::new(),
            intensity_threshold: 0.05,
            rect: Aabb::new(Vec2::new(-5000.0, -5000.0), Vec2::new(5000.0, 5000.0)),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = self.insert_element(element);
        self.calculate();
        id
    }

    pub fn remove_element(&mut self, id: ElementId) -> Result<(), SceneError> {
        let element = self
            .elements
            .remove(id)
            .ok_or(SceneError::NoSuchElement(id.0))?;
        self.history
            .push(HistoryEntry::ElementDeleted { id, element });
        self.calculate();
        Ok(())
    }

    /// Add a root ray placed by the user.
    pub fn add_ray(&mut self, ray: Ray) -> RayId {
        let id = self.insert_ray(ray);
        self.calculate();
        id
    }

    /// Remove a ray. Removing any derived ray removes its whole root tree,
    /// since derived rays only exist as recompute output.
    pub fn remove_ray(&mut self, id: RayId) -> Result<(), SceneError> {
        let mut root = id;
        loop {
            let ray = self.rays.get(root).ok_or(SceneError::NoSuchRay(id.0))?;
            match ray.parent {
                Some(parent) => root = parent,
                None => break,
            }
        }
        let ray = self
            .rays
            .remove_recursive(root)
            .ok_or(SceneError::NoSuchRay(root.0))?;
        self.history.push(HistoryEntry::RayDeleted { id: root, ray });
        self.calculate();
        Ok(())
    }

    fn insert_element(&mut self, element: Element) -> ElementId {
        let id = self.elements.insert(element);
        self.history.push(HistoryEntry::ElementAdded(id));
        id
    }

    fn insert_ray(&mut self, ray: Ray) -> RayId {
        debug_assert!(ray.is_root(), "only root rays are added directly");
        let id = self.rays.insert(ray);
        self.history.push(HistoryEntry::RayAdded(id));
        id
    }

    /// Set one element parameter by name, recording the previous value.
    ///
    /// Parameters are the fields of the element's persisted record, so
    /// `"pos"`, `"rot"`, `"mat"`, and the per-kind shape fields all work.
    /// Consecutive edits of the same parameter coalesce in the undo log.
    pub fn set_element_param(
        &mut self,
        id: ElementId,
        param: &str,
        value: serde_json::Value,
    ) -> Result<(), SceneError> {
        let previous = self.apply_element_param(id, param, value)?;
        self.history.push(HistoryEntry::ParamChanged {
            element: id,
            param: param.to_owned(),
            previous,
        });
        self.calculate();
        Ok(())
    }

    /// Apply a parameter change without touching history; returns the
    /// previous value. Works by editing the element's record as a JSON map
    /// and rebuilding the element from it.
    fn apply_element_param(
        &mut self,
        id: ElementId,
        param: &str,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, SceneError> {
        if param == "type" {
            return Err(SceneError::UnknownParam(param.to_owned()));
        }
        let element = self
            .elements
            .get(id)
            .ok_or(SceneError::NoSuchElement(id.0))?;

        let record = SceneRecord::from_element(element);
        let mut map = match serde_json::to_value(&record) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return Err(SceneError::UnknownParam(param.to_owned())),
        };
        let previous = map
            .get(param)
            .cloned()
            .ok_or_else(|| SceneError::UnknownParam(param.to_owned()))?;
        map.insert(param.to_owned(), value);

        let record: SceneRecord = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|source| SceneError::InvalidValue {
                param: param.to_owned(),
                source,
            })?;
        match record.instantiate()? {
            SceneItem::Element(new_element) => {
                // Replace in place; the handle stays valid.
                if let Some(slot) = self.elements.get_mut(id) {
                    *slot = new_element;
                }
                Ok(previous)
            }
            SceneItem::Ray(_) => Err(SceneError::UnknownParam(param.to_owned())),
        }
    }

    /// Undo the newest mutation. A no-op on an empty log or when the target
    /// no longer resolves.
    pub fn undo(&mut self) {
        let Some(entry) = self.history.pop() else {
            return;
        };
        match entry {
            HistoryEntry::ElementAdded(id) => {
                if self.elements.remove(id).is_none() {
                    log::warn!("undo: element {} already gone", id.0);
                }
            }
            HistoryEntry::ElementDeleted { id, element } => {
                self.elements.insert_at(id, element);
            }
            HistoryEntry::RayAdded(id) => {
                if self.rays.remove_recursive(id).is_none() {
                    log::warn!("undo: ray {} already gone", id.0);
                }
            }
            HistoryEntry::RayDeleted { id, ray } => {
                self.rays.restore(id, ray);
            }
            HistoryEntry::ParamChanged {
                element,
                param,
                previous,
            } => {
                if let Err(err) = self.apply_element_param(element, &param, previous) {
                    log::warn!("undo: cannot restore `{param}`: {err}");
                }
                // Restoring re-coalesced with an older edit of the same
                // parameter would leave a stale duplicate; drop it.
                self.history.pop_matching_param(element, &param);
            }
        }
        self.calculate();
    }

    /// Persistable records: every element, then every root ray.
    pub fn save_records(&self) -> Vec<SceneRecord> {
        let mut records: Vec<SceneRecord> = self
            .elements
            .iter()
            .map(|(_, e)| SceneRecord::from_element(e))
            .collect();
        records.extend(
            self.rays
                .iter()
                .filter(|(_, r)| r.is_root())
                .map(|(_, r)| SceneRecord::from_ray(r)),
        );
        records
    }

    /// Replace the scene contents with the given records. The caller runs
    /// [`Scene::calculate`] afterwards to rebuild derived rays.
    pub fn load_records(&mut self, records: &[SceneRecord]) -> Result<(), SceneError> {
        self.clear();
        for record in records {
            match record.instantiate()? {
                SceneItem::Element(element) => {
                    self.insert_element(element);
                }
                SceneItem::Ray(ray) => {
                    self.insert_ray(ray);
                }
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.rays.clear();
        self.history.clear();
    }

    /// Recompute the derived ray tree from scratch.
    ///
    /// Every pass extends each unhandled ray to the scene diagonal, finds
    /// its nearest surface hit across all elements, truncates it there, and
    /// spawns transmitted/reflected children per wavelength component.
    /// Children enter the next pass; propagation stops when a pass spawns
    /// nothing or at the pass cap.
    pub fn calculate(&mut self) -> TraceStats {
        self.reset_derived();

        let ray_len = self.rect.diagonal();
        let mut stats = TraceStats::default();
        let mut settled = false;

        while stats.passes < MAX_PASSES {
            stats.passes += 1;

            let pending: Vec<RayId> = self
                .rays
                .iter()
                .filter(|(_, r)| !r.handled)
                .map(|(id, _)| id)
                .collect();

            let mut spawned = Vec::new();
            for id in pending {
                self.process_ray(id, ray_len, &mut spawned);
            }

            if spawned.is_empty() {
                settled = true;
                break;
            }
            stats.spawned += spawned.len();

            for (element, parent, ray) in spawned {
                let child = self.rays.insert(ray);
                if let Some(p) = self.rays.get_mut(parent) {
                    p.children.push(child);
                }
                if let Some(e) = self.elements.get_mut(element) {
                    e.rays.push(child);
                }
            }
        }

        if !settled {
            log::warn!(
                "propagation stopped at the {MAX_PASSES}-pass cap; \
                 the scene likely contains a closed reflective path"
            );
        }
        stats
    }

    /// Drop everything the last recompute produced: derived rays, handled
    /// flags, and per-element ray registrations.
    fn reset_derived(&mut self) {
        let roots: Vec<RayId> = self
            .rays
            .iter()
            .filter(|(_, r)| r.is_root())
            .map(|(id, _)| id)
            .collect();
        for id in roots {
            self.rays.remove_descendants(id);
            if let Some(ray) = self.rays.get_mut(id) {
                ray.handled = false;
                ray.set_length(DEFAULT_RAY_LENGTH);
            }
        }
        for i in 0..self.elements.slots.len() {
            if let Some(element) = self.elements.slots[i].as_mut() {
                element.rays.clear();
            }
        }
    }

    /// Intersect one ray with the scene, truncate it at the nearest hit, and
    /// queue the children it spawns as `(touched element, parent, child)`.
    fn process_ray(
        &mut self,
        id: RayId,
        ray_len: f64,
        spawned: &mut Vec<(ElementId, RayId, Ray)>,
    ) {
        // Stretch first so the segment covers the whole scene.
        let (ray_p1, ray_p2, intensity, wavelengths, colors, show_arrow) = {
            let Some(ray) = self.rays.get_mut(id) else {
                return;
            };
            ray.set_length(ray_len);
            let frame = ray.frame();
            (
                frame.to_scene(ray.p1),
                frame.to_scene(ray.p2),
                ray.intensity,
                ray.wavelengths.clone(),
                ray.colors.clone(),
                ray.show_arrow,
            )
        };

        let nearest = self.nearest_hit(ray_p1, ray_p2);

        let Some((element_id, hit)) = nearest else {
            if let Some(ray) = self.rays.get_mut(id) {
                ray.handled = true;
            }
            return;
        };

        let Some(element) = self.elements.get(element_id) else {
            return;
        };
        let hit_pos = element.frame().to_scene(hit.point);
        let normal_scene = rotate(hit.normal, element.rotation_deg.to_radians());
        let indices: Vec<f64> = wavelengths
            .iter()
            .map(|&wl| element.refractive_index(wl))
            .collect();

        // Which medium does the segment start in? Any element containing the
        // start point means we are leaving glass into air.
        let inside = self
            .elements
            .iter()
            .any(|(_, e)| e.contains(e.frame().to_local(ray_p1)));

        if let Some(ray) = self.rays.get_mut(id) {
            ray.set_end_scene(hit_pos);
        }

        let direction = ray_p2 - ray_p1;
        let iface = hit.interface;

        for (idx, &wl) in wavelengths.iter().enumerate() {
            let (n1, n2) = if inside {
                (indices[idx], 1.0)
            } else {
                (1.0, indices[idx])
            };

            let angle = match signed_angle(direction, normal_scene) {
                Ok(angle) => angle,
                Err(err) => {
                    log::debug!("skipping wavelength {wl}: {err}");
                    continue;
                }
            };

            // The normal is re-oriented per branch and the transmission
            // branch's flip carries into the reflection branch below.
            let mut normal = normal_scene;
            let mut reflectance = iface.reflectance;

            if intensity * iface.transmittance > self.intensity_threshold {
                let angle_out = match iface.line_density {
                    None => safe_asin(n1 / n2 * angle.sin()),
                    Some(lines) => safe_asin(
                        (n1 * angle.sin() - GRATING_ORDER * wl * 1e-6 * lines * 1e3) / n2,
                    ),
                };
                match angle_out {
                    Some(mut angle_out) => {
                        if n2 < n1 {
                            angle_out = -angle_out;
                        }
                        if dot(normal, direction) < 0.0 {
                            normal = -normal;
                        }
                        let t_dir = rotate(normal, angle_out);
                        spawned.push((
                            element_id,
                            id,
                            Ray::child(
                                hit_pos,
                                t_dir,
                                ray_len,
                                intensity * iface.transmittance,
                                wl,
                                colors[idx],
                                show_arrow,
                                id,
                            ),
                        ));
                    }
                    // Total internal reflection: the whole branch reflects.
                    None => reflectance = 1.0,
                }
            }

            if intensity * reflectance > self.intensity_threshold {
                if dot(normal, direction) > 0.0 {
                    normal = -normal;
                }
                let angle_out = match iface.line_density {
                    None => {
                        if n2 < n1 {
                            Some(-angle)
                        } else {
                            Some(angle)
                        }
                    }
                    Some(lines) => {
                        safe_asin(angle.sin() - GRATING_ORDER * wl * 1e-6 * lines * 1e3)
                    }
                };
                if let Some(angle_out) = angle_out {
                    let t_dir = rotate(normal, -angle_out);
                    spawned.push((
                        element_id,
                        id,
                        Ray::child(
                            hit_pos,
                            t_dir,
                            ray_len,
                            intensity * reflectance,
                            wl,
                            colors[idx],
                            show_arrow,
                            id,
                        ),
                    ));
                }
            }
        }

        if let Some(element) = self.elements.get_mut(element_id) {
            if !element.rays.contains(&id) {
                element.rays.push(id);
            }
        }
        if let Some(ray) = self.rays.get_mut(id) {
            ray.handled = true;
        }
    }

    /// Nearest surface hit across all elements for a scene-space segment.
    /// Bounding boxes gate the exact tests; per element only the first
    /// (nearest) hit competes, and an exact distance tie keeps the element
    /// encountered first.
    fn nearest_hit(&self, ray_p1: Vec2, ray_p2: Vec2) -> Option<(ElementId, Hit)> {
        let mut best: Option<(ElementId, Hit)> = None;
        let mut best_distance = f64::INFINITY;
        for (element_id, element) in self.elements.iter() {
            if !element.scene_bounds().intersects_segment(ray_p1, ray_p2) {
                continue;
            }
            let frame = element.frame();
            let hits = element.intersections(frame.to_local(ray_p1), frame.to_local(ray_p2));
            if let Some(first) = hits.into_iter().next() {
                let d = distance(frame.to_scene(first.point), ray_p1);
                if d < best_distance {
                    best_distance = d;
                    best = Some((element_id, first));
                }
            }
        }
        best
    }
}

/// `asin` with the domain error surfaced as `None`.
fn safe_asin(x: f64) -> Option<f64> {
    if x.abs() > 1.0 {
        None
    } else {
        Some(x.asin())
    }
}
