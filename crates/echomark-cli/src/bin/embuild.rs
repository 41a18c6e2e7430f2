//! embuild - Build or extend a fingerprint index from a directory of audio
//!
//! Usage: embuild [--index <path>] [--append] <audio_dir>

use anyhow::{Context, Result};
use clap::Parser;
use echomark_cli::output::{print_json, BuildOutput, SkippedOutput};
use echomark_cli::{init_logging, load_settings, scan_audio_files, track_title};
use echomark_core::audio::decode_audio;
use echomark_core::{load_index_from_path, save_index_to_path, CatalogIndex, Track};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Files decoded at once; bounds the memory held by decoded audio
const DECODE_CHUNK: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "embuild")]
#[command(about = "Build an audio fingerprint index", long_about = None)]
struct Args {
    /// Directory scanned recursively for audio files
    audio_dir: String,

    /// Index file (overrides the configured path)
    #[arg(short, long)]
    index: Option<String>,

    /// Add new files to an existing index instead of rebuilding it
    #[arg(short, long)]
    append: bool,

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
    let audio_dir = Path::new(&args.audio_dir);

    let start = std::time::Instant::now();

    let mut index = if args.append && index_path.exists() {
        let index = load_index_from_path(&index_path)
            .with_context(|| format!("Failed to load index: {}", index_path.display()))?;
        if index.config() != &settings.fingerprint {
            log::warn!("Index was built with different fingerprint parameters; keeping those");
        }
        index
    } else {
        CatalogIndex::new(settings.fingerprint.clone())?
    };

    let known: HashSet<String> = index.tracks().iter().map(|t| t.title.clone()).collect();
    let files: Vec<PathBuf> = scan_audio_files(audio_dir)?
        .into_iter()
        .filter(|path| !known.contains(&track_title(audio_dir, path)))
        .collect();

    log::info!(
        "Found {} new audio files in {}",
        files.len(),
        audio_dir.display()
    );

    let sample_rate = index.config().sample_rate;
    let mut next_id = index.next_track_id();
    let mut indexed = 0;
    let mut skipped = Vec::new();

    for chunk in files.chunks(DECODE_CHUNK) {
        let first_id = next_id;
        next_id = u32::try_from(chunk.len())
            .ok()
            .and_then(|n| next_id.checked_add(n))
            .context("Track ids exhausted")?;

        let decoded: Vec<(PathBuf, echomark_core::Result<Track>)> = chunk
            .par_iter()
            .enumerate()
            .map(|(offset, path)| {
                let track = decode_audio(path, sample_rate).map(|audio| {
                    Track::new(
                        first_id + offset as u32,
                        track_title(audio_dir, path),
                        audio.into_waveform(),
                    )
                });
                (path.clone(), track)
            })
            .collect();

        let mut tracks = Vec::with_capacity(decoded.len());
        for (path, track) in decoded {
            match track {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    skipped.push(SkippedOutput {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let report = index.extend(tracks);
        indexed += report.indexed.len();
        skipped.extend(report.skipped.into_iter().map(|s| SkippedOutput {
            path: s.title,
            reason: s.error.to_string(),
        }));

        log::info!("Indexed {}/{} files", indexed, files.len());
    }

    save_index_to_path(&index, &index_path, &settings.index)
        .with_context(|| format!("Failed to write index: {}", index_path.display()))?;

    print_json(&BuildOutput {
        status: "success",
        index_path: index_path.display().to_string(),
        tracks_indexed: indexed,
        tracks_skipped: skipped.len(),
        skipped,
        total_tracks: index.num_tracks(),
        total_hashes: index.num_hashes(),
        total_entries: index.num_entries(),
        processing_time_seconds: start.elapsed().as_secs_f64(),
    });

    Ok(())
}
