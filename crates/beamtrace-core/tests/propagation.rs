//! Integration tests: propagation physics against closed-form optics.
//!
//! Each test builds a small scene, runs a full recompute, and checks the
//! spawned ray tree against Snell's law, the grating equation, or energy
//! bookkeeping.

use beamtrace_core::element::ElementKind;
use beamtrace_core::{Element, Ray, Scene};
use beamtrace_geometry::{normalize, Vec2};
use beamtrace_materials::Material;

use approx::assert_relative_eq;

/// Unit direction of a traced segment in scene coordinates.
fn direction(ray: &Ray) -> Vec2 {
    let frame = ray.frame();
    normalize(frame.to_scene(ray.p2) - frame.to_scene(ray.p1)).unwrap()
}

#[test]
fn test_partial_mirror_splits_intensity() {
    let mut scene = Scene::new();

    let mut mirror = Element::mirror().with_position(Vec2::new(500.0, 0.0));
    if let ElementKind::Mirror(p) = &mut mirror.kind {
        p.ref1 = 0.0;
        p.tran1 = 1.0;
        p.ref2 = 0.3;
        p.tran2 = 0.7;
    }
    mirror.rebuild_surfaces();
    scene.add_element(mirror);

    let root = scene.add_ray(Ray::root(Vec2::ZERO, 0.0, 1.0, vec![1.03]));
    scene.calculate();

    let children = scene.rays.get(root).unwrap().children.clone();
    assert_eq!(children.len(), 2, "one transmitted and one reflected ray");

    // Normal incidence: the transmitted ray continues along +x, the
    // reflected one returns along -x.
    let transmitted = scene.rays.get(children[0]).unwrap();
    let reflected = scene.rays.get(children[1]).unwrap();
    assert!(direction(transmitted).x > 0.99);
    assert!(direction(reflected).x < -0.99);
    assert_relative_eq!(transmitted.intensity, 0.7);
    assert_relative_eq!(reflected.intensity, 0.3);

    // The root was truncated at the front face.
    let root_ray = scene.rays.get(root).unwrap();
    assert_relative_eq!(root_ray.length(), 485.0, epsilon = 1e-9);
}

#[test]
fn test_refraction_follows_snells_law() {
    let mut scene = Scene::new();

    // A flat window at the origin.
    let mut window = Element::lens();
    if let ElementKind::Lens(p) = &mut window.kind {
        p.r1 = None;
        p.r2 = None;
    }
    window.rebuild_surfaces();
    scene.add_element(window);

    let wl = 0.5876;
    let root = scene.add_ray(Ray::root(Vec2::new(-100.0, 0.0), 30.0, 1.0, vec![wl]));
    scene.calculate();

    let children = scene.rays.get(root).unwrap().children.clone();
    assert_eq!(children.len(), 1, "fully transmissive face refracts only");

    let n = Material::Bk7.refractive_index(wl);
    let expected = (30.0_f64.to_radians().sin() / n).asin();
    let dir = direction(scene.rays.get(children[0]).unwrap());
    assert_relative_eq!(dir.y.atan2(dir.x), expected, epsilon = 1e-9);
}

#[test]
fn test_total_internal_reflection() {
    let mut scene = Scene::new();

    // A thick window with the ray origin buried inside the glass; 50° is
    // past the BK7 critical angle (~41.2°).
    let mut window = Element::lens();
    if let ElementKind::Lens(p) = &mut window.kind {
        p.r1 = None;
        p.r2 = None;
        p.thickness = 200.0;
    }
    window.rebuild_surfaces();
    scene.add_element(window);

    let root = scene.add_ray(Ray::root(Vec2::ZERO, 50.0, 1.0, vec![0.5876]));
    let stats = scene.calculate();

    let children = scene.rays.get(root).unwrap().children.clone();
    assert_eq!(children.len(), 1, "transmission fails, everything reflects");

    let reflected = scene.rays.get(children[0]).unwrap();
    assert_relative_eq!(reflected.intensity, 1.0);
    let dir = direction(reflected);
    assert_relative_eq!(
        dir.y.atan2(dir.x),
        130.0_f64.to_radians(),
        epsilon = 1e-9
    );

    // The reflected ray dies on the absorbing top edge.
    assert_eq!(stats.spawned, 1);
}

#[test]
fn test_grating_spreads_wavelengths() {
    let mut scene = Scene::new();
    scene.add_element(Element::grating().with_position(Vec2::new(500.0, 0.0)));

    let wavelengths = vec![0.4, 0.6, 0.8];
    let root = scene.add_ray(Ray::root(Vec2::ZERO, 0.0, 1.0, wavelengths.clone()));
    scene.calculate();

    let children = scene.rays.get(root).unwrap().children.clone();
    assert_eq!(children.len(), 3, "one diffracted ray per wavelength");

    // First order at normal incidence: sin(angle) = m * lambda * d^-1 / n,
    // so longer wavelengths leave at steeper angles.
    let mut angles = Vec::new();
    for (&child, &wl) in children.iter().zip(&wavelengths) {
        let ray = scene.rays.get(child).unwrap();
        assert_eq!(ray.wavelengths, vec![wl]);
        let dir = direction(ray);
        angles.push(dir.y.atan2(dir.x));
    }
    assert!(angles[0] > 0.0);
    assert!(angles[0] < angles[1] && angles[1] < angles[2]);

    let n = Material::Bk7.refractive_index(0.4);
    assert_relative_eq!(angles[0], (0.4e-6 * 600.0e3 / n).asin(), epsilon = 1e-9);
}

#[test]
fn test_beam_block_terminates_rays() {
    let mut scene = Scene::new();
    scene.add_element(Element::beam_block().with_position(Vec2::new(500.0, 0.0)));

    let root = scene.add_ray(Ray::root(Vec2::ZERO, 0.0, 1.0, vec![1.03]));
    let stats = scene.calculate();

    assert_eq!(stats.passes, 1);
    assert_eq!(stats.spawned, 0);
    let root_ray = scene.rays.get(root).unwrap();
    assert!(root_ray.handled);
    assert!(root_ray.children.is_empty());
    assert_relative_eq!(root_ray.length(), 485.0, epsilon = 1e-9);
}

#[test]
fn test_facing_mirrors_stop_at_pass_cap() {
    let mut scene = Scene::new();
    scene.add_element(Element::mirror().with_position(Vec2::new(-500.0, 0.0)));
    scene.add_element(Element::mirror().with_position(Vec2::new(500.0, 0.0)));
    scene.add_ray(Ray::root(Vec2::ZERO, 0.0, 1.0, vec![1.03]));

    let stats = scene.calculate();

    // Lossless bouncing never starves; each pass reflects exactly once.
    assert_eq!(stats.passes, 100);
    assert_eq!(stats.spawned, 100);
    assert!(scene.rays.iter().all(|(_, r)| r.intensity == 1.0));
}

#[test]
fn test_child_intensity_never_exceeds_parent() {
    let mut scene = Scene::new();
    scene.add_element(Element::prism().with_position(Vec2::new(300.0, 0.0)));
    scene.add_ray(Ray::root(Vec2::ZERO, 0.0, 1.0, vec![0.5]));

    let stats = scene.calculate();
    assert!(stats.spawned > 0);

    for (_, ray) in scene.rays.iter() {
        if let Some(parent) = ray.parent {
            let parent = scene.rays.get(parent).unwrap();
            assert!(
                ray.intensity <= parent.intensity + 1e-12,
                "child {} exceeds parent {}",
                ray.intensity,
                parent.intensity
            );
        }
        // Nothing below the spawn threshold survives.
        assert!(ray.intensity > 0.05);
    }
}

#[test]
fn test_recompute_is_stable() {
    let mut scene = Scene::new();
    scene.add_element(Element::lens().with_position(Vec2::new(400.0, 0.0)));
    scene.add_ray(Ray::root(Vec2::new(0.0, 30.0), 0.0, 1.0, vec![0.4, 0.7]));

    let first = scene.calculate();
    let count_first = scene.rays.len();
    let second = scene.calculate();

    assert_eq!(first.passes, second.passes);
    assert_eq!(first.spawned, second.spawned);
    assert_eq!(scene.rays.len(), count_first);
}
