//! Synthetic test signals
//!
//! Tracks are sequences of short percussive notes (fast attack, exponential
//! decay) at random pitches, so each note leaves one sharp spectral peak.

#![allow(dead_code)]

use echomark_core::{Track, Waveform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub const ANALYSIS_RATE: u32 = 11025;

/// A random melody of percussive notes
pub fn percussive_track(seed: u64, duration_secs: f64, sample_rate: u32) -> Waveform {
    let mut rng = StdRng::seed_from_u64(seed);
    let rate = sample_rate as f64;
    let len = (duration_secs * rate) as usize;
    let note_len = (0.25 * rate) as usize;
    let attack_len = 0.005 * rate;

    let mut samples = vec![0.0f32; len];
    let mut onset = (rng.random_range(0.0..0.1) * rate) as usize;

    while onset < len {
        let freq: f64 = rng.random_range(200.0..3000.0);
        let amplitude: f64 = rng.random_range(0.2..0.4);
        let step = 2.0 * PI * freq / rate;
        let end = (onset + note_len).min(len);

        for (k, sample) in samples[onset..end].iter_mut().enumerate() {
            let attack = (k as f64 / attack_len).min(1.0);
            let decay = (-(k as f64) / (0.06 * rate)).exp();
            *sample += (amplitude * attack * decay * (step * k as f64).sin()) as f32;
        }

        onset += (rng.random_range(0.12..0.3) * rate) as usize;
    }

    Waveform::new(samples, sample_rate)
}

/// Uniform noise in `[-amplitude, amplitude]`
pub fn noise(seed: u64, duration_secs: f64, sample_rate: u32, amplitude: f32) -> Waveform {
    let mut rng = StdRng::seed_from_u64(seed);
    let len = (duration_secs * sample_rate as f64) as usize;
    let samples = (0..len)
        .map(|_| rng.random_range(-amplitude..=amplitude))
        .collect();
    Waveform::new(samples, sample_rate)
}

/// `waveform` with uniform noise added
pub fn with_noise(waveform: &Waveform, amplitude: f32, seed: u64) -> Waveform {
    let noise = noise(seed, waveform.duration_secs() + 1.0, waveform.sample_rate, amplitude);
    let samples = waveform
        .samples
        .iter()
        .zip(&noise.samples)
        .map(|(s, n)| s + n)
        .collect();
    Waveform::new(samples, waveform.sample_rate)
}

/// Catalog of `count` distinct tracks with ids `0..count`
pub fn catalog(count: u32, duration_secs: f64) -> Vec<Track> {
    (0..count)
        .map(|id| {
            Track::new(
                id,
                format!("track {}", id),
                percussive_track(1000 + id as u64, duration_secs, ANALYSIS_RATE),
            )
        })
        .collect()
}
