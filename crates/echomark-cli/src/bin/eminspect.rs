//! eminspect - Validate an index file and print its statistics
//!
//! Usage: eminspect [--index <path>] [--tracks]

use anyhow::{Context, Result};
use clap::Parser;
use echomark_cli::output::{print_json, InspectOutput};
use echomark_cli::{init_logging, load_settings};
use echomark_core::load_index_from_path;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eminspect")]
#[command(about = "Inspect an audio fingerprint index", long_about = None)]
struct Args {
    /// Index file (overrides the configured path)
    #[arg(short, long)]
    index: Option<String>,

    /// List every indexed track
    #[arg(short, long)]
    tracks: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = load_settings(args.config.as_deref())?;
    let index_path = PathBuf::from(args.index.as_deref().unwrap_or(&settings.index.path));

    // Loading validates the header, checksum and per-track counts
    let index = load_index_from_path(&index_path)
        .with_context(|| format!("Failed to load index: {}", index_path.display()))?;

    print_json(&InspectOutput {
        index_path: index_path.display().to_string(),
        num_tracks: index.num_tracks(),
        num_hashes: index.num_hashes(),
        num_entries: index.num_entries(),
        fingerprint: index.config(),
        tracks: args.tracks.then(|| index.tracks()),
    });

    Ok(())
}
