//! Compute a layout from a geometry snapshot JSON file.
//!
//! Usage: compute_layout <snapshot.json | -> [corridor_width] [target_density]
//!
//! Reads the snapshot emitted by the CAD ingestion collaborator, runs the
//! engine, and prints the layout as JSON on stdout.

use anyhow::{Context, Result};
use std::io::Read;

use floorplan_layout::{compute_layout, GeometrySnapshot, LayoutConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let raw = match args.get(1).map(String::as_str) {
        None | Some("-") => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read snapshot from stdin")?;
            buffer
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot file: {}", path))?,
    };

    let snapshot = GeometrySnapshot::from_json_str(&raw)?;

    let mut config = LayoutConfig::default();
    if let Some(width) = args.get(2) {
        config.corridor_width = width
            .parse()
            .with_context(|| format!("invalid corridor width: {}", width))?;
    }
    if let Some(density) = args.get(3) {
        config.target_density = density
            .parse()
            .with_context(|| format!("invalid target density: {}", density))?;
    }

    let layout = compute_layout(&snapshot, &config);

    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}
