//! Scene loading and segment reporting.

use std::path::Path;

use anyhow::{Context, Result};

use beamtrace_core::{RayId, Scene, SceneRecord, TraceStats};

/// Load a scene from a JSON file (an array of element and ray records).
pub fn load_scene(path: &Path) -> Result<Scene> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read scene file {}", path.display()))?;
    let records: Vec<SceneRecord> = serde_json::from_str(&text)
        .with_context(|| format!("cannot parse scene file {}", path.display()))?;

    let mut scene = Scene::new();
    scene
        .load_records(&records)
        .with_context(|| format!("cannot build scene from {}", path.display()))?;
    Ok(scene)
}

/// Print the ray trees, one root per top-level entry, indented by depth.
pub fn print_ray_tree(scene: &Scene) {
    for (id, ray) in scene.rays.iter() {
        if ray.is_root() {
            print_subtree(scene, id, 0);
        }
    }
}

fn print_subtree(scene: &Scene, id: RayId, depth: usize) {
    let Some(ray) = scene.rays.get(id) else {
        return;
    };
    let wls = ray
        .wavelengths
        .iter()
        .map(|wl| format!("{wl}"))
        .collect::<Vec<_>>()
        .join(";");
    println!(
        "{:indent$}ray i={:.3} wl=[{}] len={:.1}",
        "",
        ray.intensity,
        wls,
        ray.length(),
        indent = depth * 2
    );
    for &child in &ray.children {
        print_subtree(scene, child, depth + 1);
    }
}

/// Write every traced ray segment as one CSV row, in scene coordinates.
pub fn write_segments_csv(scene: &Scene, stats: &TraceStats, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("cannot create {}", path.display()))?;

    // Metadata header
    writeln!(file, "# Beamtrace - Ray Segments")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# passes: {}", stats.passes)?;
    writeln!(file, "# derived_rays: {}", stats.spawned)?;
    writeln!(file, "#")?;
    writeln!(file, "segment,root,x1,y1,x2,y2,intensity,wavelengths_um")?;

    for (i, (_, ray)) in scene.rays.iter().enumerate() {
        let frame = ray.frame();
        let p1 = frame.to_scene(ray.p1);
        let p2 = frame.to_scene(ray.p2);
        let wls = ray
            .wavelengths
            .iter()
            .map(|wl| format!("{wl}"))
            .collect::<Vec<_>>()
            .join(";");
        writeln!(
            file,
            "{},{},{:.3},{:.3},{:.3},{:.3},{:.4},{}",
            i,
            ray.is_root(),
            p1.x,
            p1.y,
            p2.x,
            p2.y,
            ray.intensity,
            wls
        )?;
    }
    Ok(())
}
