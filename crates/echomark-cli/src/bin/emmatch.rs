//! emmatch - Recognize audio clips against a fingerprint index
//!
//! Usage: emmatch [--index <path>] [--top <k>] <clip>...

use anyhow::{Context, Result};
use clap::Parser;
use echomark_cli::output::{print_json, CandidateOutput, MatchOutput, QueryOutput};
use echomark_cli::{init_logging, load_settings};
use echomark_core::audio::decode_audio;
use echomark_core::{
    extract_fingerprints, load_index_from_path, CatalogIndex, Matcher, MatchingConfig,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "emmatch")]
#[command(about = "Recognize audio clips against an index", long_about = None)]
struct Args {
    /// Audio clips to recognize
    #[arg(required = true)]
    queries: Vec<String>,

    /// Index file (overrides the configured path)
    #[arg(short, long)]
    index: Option<String>,

    /// Also list the best k candidate tracks
    #[arg(short, long, default_value_t = 0)]
    top: usize,

    /// Only use the clip from this many seconds on
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Only use this many seconds of the clip
    #[arg(long)]
    duration: Option<f64>,

    /// Minimum aligned matches for a recognition (overrides the config)
    #[arg(long)]
    min_matches: Option<usize>,

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

    let mut matching = settings.matching.clone();
    if let Some(min_matches) = args.min_matches {
        matching.min_matches = min_matches;
    }
    matching.validate()?;

    let load_start = std::time::Instant::now();
    let index = load_index_from_path(&index_path)
        .with_context(|| format!("Failed to load index: {}", index_path.display()))?;
    log::info!(
        "Loaded {} tracks in {:.2}s",
        index.num_tracks(),
        load_start.elapsed().as_secs_f64()
    );

    let match_start = std::time::Instant::now();
    let results: Vec<QueryOutput> = args
        .queries
        .par_iter()
        .map(|query| run_query(&index, &matching, &args, Path::new(query)))
        .collect();

    let recognized = results.iter().filter(|r| r.is_match()).count();
    log::info!(
        "Matched {} queries in {:.2}s, {} recognized",
        results.len(),
        match_start.elapsed().as_secs_f64(),
        recognized
    );

    print_json(&MatchOutput {
        queries: results.len(),
        recognized,
        results,
    });

    Ok(())
}

fn run_query(
    index: &CatalogIndex,
    matching: &MatchingConfig,
    args: &Args,
    path: &Path,
) -> QueryOutput {
    let query_path = path.display().to_string();
    let config = index.config();

    let audio = match decode_audio(path, config.sample_rate) {
        Ok(audio) => audio,
        Err(e) => {
            log::warn!("{}: {}", query_path, e);
            return QueryOutput::failed(query_path, e);
        }
    };

    let mut waveform = audio.into_waveform();
    if args.start > 0.0 || args.duration.is_some() {
        waveform = waveform.excerpt(args.start, args.duration);
    }

    let fingerprints = match extract_fingerprints(&waveform, config) {
        Ok(fingerprints) => fingerprints,
        Err(e) => {
            log::warn!("{}: {}", query_path, e);
            return QueryOutput::failed(query_path, e);
        }
    };

    let matcher = Matcher::new(index, matching);
    let candidates = if args.top > 0 {
        matcher
            .rank(&fingerprints)
            .iter()
            .take(args.top)
            .map(|c| CandidateOutput::new(c, index))
            .collect()
    } else {
        Vec::new()
    };

    QueryOutput {
        query_path,
        recognition: Some(matcher.recognize_fingerprints(&fingerprints)),
        error: None,
        candidates,
    }
}
