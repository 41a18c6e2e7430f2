//! Echomark Core - Audio Fingerprinting and Recognition
//!
//! Reference recordings are reduced to spectral landmarks, landmark pairs
//! are hashed into fingerprints and the fingerprints go into an inverted
//! index. A short, possibly noisy clip is recognized by looking up its own
//! fingerprints and voting on the time offset between clip and reference.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod landmark;
pub mod matching;
pub mod settings;
pub mod store;
pub mod transform;
pub mod waveform;

pub use catalog::{BuildReport, SkippedTrack, Track};
pub use config::{FingerprintConfig, MatchingConfig, WindowFunction};
pub use error::{EchomarkError, Result};
pub use fingerprint::{Fingerprint, FingerprintGenerator, HashLayout};
pub use index::{CatalogEntry, CatalogIndex, SharedIndex, TrackId, TrackInfo};
pub use landmark::{Landmark, PeakExtractor};
pub use matching::{Candidate, MatchResult, Matcher, Recognition};
pub use settings::EchomarkSettings;
pub use store::{load_index, load_index_from_path, save_index, save_index_to_path};
pub use transform::{compute_spectrogram, Spectrogram};
pub use waveform::Waveform;

/// Fingerprint a waveform.
///
/// The configuration is validated and the waveform resampled to the
/// analysis rate first. Audio too short for one analysis window, or too
/// flat to yield landmark pairs, is an `InsufficientAudio` error.
pub fn extract_fingerprints(
    waveform: &Waveform,
    config: &FingerprintConfig,
) -> Result<Vec<Fingerprint>> {
    config.validate()?;
    if waveform.sample_rate == 0 {
        return Err(EchomarkError::InsufficientAudio(
            "waveform has no sample rate".to_string(),
        ));
    }

    let resampled;
    let samples = if waveform.sample_rate == config.sample_rate {
        &waveform.samples
    } else {
        resampled = waveform.resampled(config.sample_rate)?;
        &resampled.samples
    };

    let spectrogram = compute_spectrogram(samples, config);
    if spectrogram.is_empty() {
        return Err(EchomarkError::InsufficientAudio(format!(
            "{:.3}s of audio is shorter than one analysis window",
            waveform.duration_secs()
        )));
    }

    let landmarks = PeakExtractor::new(config).extract(&spectrogram);
    if landmarks.is_empty() {
        return Err(EchomarkError::InsufficientAudio(format!(
            "no spectral peaks in {} frames",
            spectrogram.num_frames
        )));
    }

    let fingerprints = FingerprintGenerator::new(config).generate(&landmarks);
    if fingerprints.is_empty() {
        return Err(EchomarkError::InsufficientAudio(format!(
            "{} landmarks but no pairs within the target zone",
            landmarks.len()
        )));
    }

    log::debug!(
        "{:.2}s: {} frames, {} landmarks, {} fingerprints",
        waveform.duration_secs(),
        spectrogram.num_frames,
        landmarks.len(),
        fingerprints.len()
    );

    Ok(fingerprints)
}

/// Build an index over a catalog of tracks
pub fn build_index(
    tracks: Vec<Track>,
    config: FingerprintConfig,
) -> Result<(CatalogIndex, BuildReport)> {
    CatalogIndex::build(tracks, config)
}

/// Recognize a clip against an index
pub fn recognize(
    index: &CatalogIndex,
    query: &Waveform,
    config: &MatchingConfig,
) -> Result<Recognition> {
    config.validate()?;
    Matcher::new(index, config).recognize(query)
}
