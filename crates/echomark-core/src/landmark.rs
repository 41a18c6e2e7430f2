//! Landmark extraction using 2D max filtering
//!
//! A landmark is a spectrogram point that is the strict maximum of its
//! time/frequency neighborhood and louder than a fixed floor. When several
//! points of a neighborhood share the maximum, the one with the smallest
//! `(time, frequency)` index wins.

use crate::config::FingerprintConfig;
use crate::transform::Spectrogram;
use std::collections::VecDeque;

/// A local maximum in the spectrogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Time index (frame number)
    pub t: u32,
    /// Frequency bin index
    pub f: u16,
    /// Magnitude value, only used for tie breaking
    pub m: f32,
}

impl Landmark {
    pub fn new(t: u32, f: u16, m: f32) -> Self {
        Self { t, f, m }
    }
}

/// Landmark extractor
pub struct PeakExtractor {
    time_radius: usize,
    freq_radius: usize,
    min_magnitude: f32,
}

impl PeakExtractor {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self {
            time_radius: config.neighborhood_time / 2,
            freq_radius: config.neighborhood_freq / 2,
            min_magnitude: config.min_magnitude,
        }
    }

    /// Extract landmarks ordered by `(t, f)`
    pub fn extract(&self, spectrogram: &Spectrogram) -> Vec<Landmark> {
        if spectrogram.is_empty() || spectrogram.num_bins == 0 {
            return Vec::new();
        }

        let max_filtered = self.apply_2d_max_filter(spectrogram);

        let mut landmarks = Vec::new();
        for t in 0..spectrogram.num_frames {
            for f in 0..spectrogram.num_bins {
                let m = spectrogram.magnitudes[t][f];
                if m <= self.min_magnitude || m != max_filtered[t][f] {
                    continue;
                }
                if self.has_earlier_tie(spectrogram, t, f, m) {
                    continue;
                }
                landmarks.push(Landmark::new(t as u32, f as u16, m));
            }
        }

        log::trace!(
            "Extracted {} landmarks from {} frames",
            landmarks.len(),
            spectrogram.num_frames
        );

        landmarks
    }

    /// Separable 2D max filter (frequency then time)
    fn apply_2d_max_filter(&self, spectrogram: &Spectrogram) -> Vec<Vec<f32>> {
        let num_frames = spectrogram.num_frames;
        let num_bins = spectrogram.num_bins;

        let mut filtered = vec![vec![0.0; num_bins]; num_frames];
        for (row, out) in spectrogram.magnitudes.iter().zip(filtered.iter_mut()) {
            sliding_max(row, self.freq_radius, out);
        }

        let mut column = vec![0.0; num_frames];
        let mut column_max = vec![0.0; num_frames];
        for f in 0..num_bins {
            for t in 0..num_frames {
                column[t] = filtered[t][f];
            }
            sliding_max(&column, self.time_radius, &mut column_max);
            for t in 0..num_frames {
                filtered[t][f] = column_max[t];
            }
        }

        filtered
    }

    /// True if a lexicographically smaller point in the neighborhood has
    /// the same magnitude
    fn has_earlier_tie(&self, spectrogram: &Spectrogram, t: usize, f: usize, m: f32) -> bool {
        let t_start = t.saturating_sub(self.time_radius);
        let f_start = f.saturating_sub(self.freq_radius);
        let f_end = (f + self.freq_radius + 1).min(spectrogram.num_bins);

        for ti in t_start..=t {
            let row = &spectrogram.magnitudes[ti];
            let f_stop = if ti == t { f } else { f_end };
            if row[f_start..f_stop].iter().any(|&other| other == m) {
                return true;
            }
        }
        false
    }
}

/// Maximum over `[i - radius, i + radius]` (clipped) for every `i`
fn sliding_max(input: &[f32], radius: usize, output: &mut [f32]) {
    let n = input.len();
    let mut window: VecDeque<usize> = VecDeque::with_capacity(2 * radius + 1);
    let mut next = 0;

    for i in 0..n {
        let hi = (i + radius).min(n - 1);
        while next <= hi {
            while let Some(&back) = window.back() {
                if input[back] <= input[next] {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }

        let lo = i.saturating_sub(radius);
        while let Some(&front) = window.front() {
            if front < lo {
                window.pop_front();
            } else {
                break;
            }
        }

        output[i] = input[window[0]];
    }
}
