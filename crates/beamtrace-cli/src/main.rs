//! Beamtrace command-line interface.
//!
//! Trace scenes saved as JSON files:
//! ```sh
//! beamtrace trace scene.json -o segments.csv
//! beamtrace validate scene.json
//! beamtrace materials
//! ```

mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use beamtrace_materials::Material;

#[derive(Parser)]
#[command(name = "beamtrace")]
#[command(about = "Beamtrace: 2D optical ray propagation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a scene file and report the resulting ray segments.
    Trace {
        /// Path to the scene JSON file.
        scene: PathBuf,
        /// Write the traced segments as CSV to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a scene file without tracing it.
    Validate {
        /// Path to the scene JSON file.
        scene: PathBuf,
    },
    /// Display the material catalog.
    Materials,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Trace { scene, output } => {
            println!("Beamtrace");
            println!("=========");
            let mut sc = runner::load_scene(&scene)?;
            println!("Scene: {}", scene.display());
            println!(
                "  {} elements, {} root rays",
                sc.elements.len(),
                sc.rays.len()
            );

            let stats = sc.calculate();
            println!(
                "Traced in {} passes, {} derived rays",
                stats.passes, stats.spawned
            );
            println!();
            runner::print_ray_tree(&sc);

            if let Some(path) = output {
                runner::write_segments_csv(&sc, &stats, &path)?;
                println!("Segments written to {}", path.display());
            }
            Ok(())
        }
        Commands::Validate { scene } => {
            let sc = runner::load_scene(&scene)?;
            println!(
                "Scene is valid: {} ({} elements, {} root rays)",
                scene.display(),
                sc.elements.len(),
                sc.rays.len()
            );
            Ok(())
        }
        Commands::Materials => {
            println!("Available materials (index at 587.6 nm):");
            println!();
            for name in Material::NAMES {
                if let Ok(mat) = Material::from_name(name) {
                    println!("  {:<5} n = {:.4}", name, mat.refractive_index(0.5876));
                }
            }
            Ok(())
        }
    }
}
