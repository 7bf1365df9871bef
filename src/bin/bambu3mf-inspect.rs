//! Painted 3MF inspector
//!
//! Imports a package and prints the detected layout, the filament table and
//! the resolved colors of every object, either as a text report or as JSON.

#![forbid(unsafe_code)]

use bambu3mf::{
    ColorAssignment, ColorMode, ColoredObject, ImportConfig, ImportResult, MetadataPolicy,
    import_path,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the 3MF file to inspect
    #[arg(value_name = "FILE")]
    file_path: PathBuf,

    /// Resolve per-vertex colors instead of a face palette
    #[arg(long)]
    vertex: bool,

    /// Palette merge distance in RGB units (0-100)
    #[arg(short, long, value_name = "N", default_value_t = 10.0)]
    threshold: f64,

    /// Padding around the painted region in millimeters (0-10)
    #[arg(short, long, value_name = "MM", default_value_t = 0.1)]
    padding: f64,

    /// Continue with no filament colors when the slicing metadata is malformed
    #[arg(long)]
    lenient: bool,

    /// Print the full import result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if args.vertex {
        ColorMode::Vertex
    } else {
        ColorMode::Material
    };
    let policy = if args.lenient {
        MetadataPolicy::Lenient
    } else {
        MetadataPolicy::Strict
    };
    let config = ImportConfig::new()
        .with_mode(mode)
        .with_similarity_threshold(args.threshold)
        .with_bbox_padding(args.padding)
        .with_metadata_policy(policy);

    let result = import_path(&args.file_path, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(args, &result);
    }
    Ok(())
}

fn print_report(args: &Args, result: &ImportResult) {
    println!("File:      {}", args.file_path.display());
    println!("Layout:    {:?}", result.package.layout);
    println!("Entries:   {}", result.package.entries.len());
    println!("Objects:   {}", result.objects.len());
    println!();

    if !result.package.filament_colors.is_empty() {
        println!("Filaments:");
        for (id, color) in result.package.filament_colors.iter() {
            println!("  {:>3}  {}", id, color.to_hex());
        }
        println!();
    }

    for object in &result.objects {
        print_object(object, result.bbox_padding);
    }
}

fn print_object(object: &ColoredObject, padding: f64) {
    let label = match (&object.name, object.id) {
        (Some(name), Some(id)) => format!("{} (id {})", name, id),
        (Some(name), None) => name.clone(),
        (None, Some(id)) => format!("id {}", id),
        (None, None) => "<unnamed>".to_string(),
    };
    println!("Object {} [{}]", label, object.entry);
    println!(
        "  {} vertices, {} triangles, {} painted",
        object.vertices.len(),
        object.triangles.len(),
        object.painted_faces
    );

    match &object.colors {
        ColorAssignment::Palette { palette, .. } => {
            let hex: Vec<String> = palette.iter().map(|c| c.to_hex()).collect();
            println!("  palette ({}): {}", palette.len(), hex.join(" "));
        }
        ColorAssignment::PerVertex { colors } => {
            println!("  {} vertex colors", colors.len());
        }
    }

    match object.region_split(padding) {
        Some(split) => {
            let (min, max) = (split.colored.min, split.colored.max);
            println!(
                "  painted region ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
                min.x, min.y, min.z, max.x, max.y, max.z
            );
        }
        None => println!("  no painted region"),
    }
    println!();
}
