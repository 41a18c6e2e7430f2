//! Configuration parameters for fingerprinting and matching
//!
//! Defaults were calibrated against the synthetic recognition tests: an
//! 11025 Hz analysis rate with 1024-sample windows and a 256-sample hop
//! gives ~93 ms of frequency resolution and ~23 ms time steps.

use crate::error::{EchomarkError, Result};
use serde::{Deserialize, Serialize};

/// Window applied to each analysis frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl Default for WindowFunction {
    fn default() -> Self {
        WindowFunction::Hann
    }
}

/// Parameters of the extraction pipeline (spectrogram, landmarks, hashes).
///
/// An index remembers the values it was built with; queries against it are
/// always fingerprinted with the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    // Audio processing
    pub sample_rate: u32,

    // Spectrogram
    pub window_size: usize,
    pub hop_size: usize,
    pub window: WindowFunction,

    // Landmark extraction
    pub neighborhood_time: usize,
    pub neighborhood_freq: usize,
    pub min_magnitude: f32,

    // Hashing
    pub target_zone_size: usize,
    pub min_time_delta: u32,
    pub max_time_delta: u32,
    pub hash_freq_bits: u32,
    pub hash_delta_bits: u32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sample_rate: 11025,

            window_size: 1024,
            hop_size: 256,
            window: WindowFunction::Hann,

            neighborhood_time: 15,
            neighborhood_freq: 31,
            min_magnitude: 1.0,

            target_zone_size: 10,
            min_time_delta: 1,
            max_time_delta: 63,
            hash_freq_bits: 10,
            hash_delta_bits: 8,
        }
    }
}

impl FingerprintConfig {
    /// Number of frequency bins per spectrogram frame
    pub fn num_bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Duration of one hop in seconds
    pub fn frame_duration(&self) -> f64 {
        self.hop_size as f64 / self.sample_rate as f64
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate must be > 0"));
        }
        if self.window_size < 16 {
            return Err(invalid("window_size must be >= 16"));
        }
        if self.hop_size == 0 || self.hop_size > self.window_size {
            return Err(invalid("hop_size must be in 1..=window_size"));
        }
        if self.neighborhood_time == 0 || self.neighborhood_freq == 0 {
            return Err(invalid("neighborhood sizes must be > 0"));
        }
        if !self.min_magnitude.is_finite() || self.min_magnitude < 0.0 {
            return Err(invalid("min_magnitude must be a finite value >= 0"));
        }
        if self.target_zone_size == 0 {
            return Err(invalid("target_zone_size must be > 0"));
        }
        if self.min_time_delta > self.max_time_delta {
            return Err(invalid("min_time_delta must be <= max_time_delta"));
        }
        if 2 * self.hash_freq_bits + self.hash_delta_bits > 64 {
            return Err(invalid("hash fields must fit in 64 bits"));
        }
        if (self.num_bins() as u64 - 1) >> self.hash_freq_bits != 0 {
            return Err(invalid(&format!(
                "hash_freq_bits = {} cannot hold frequency bin {}",
                self.hash_freq_bits,
                self.num_bins() - 1
            )));
        }
        if (self.max_time_delta as u64) >> self.hash_delta_bits != 0 {
            return Err(invalid(&format!(
                "hash_delta_bits = {} cannot hold max_time_delta {}",
                self.hash_delta_bits, self.max_time_delta
            )));
        }
        if self.num_bins() > u16::MAX as usize {
            return Err(invalid("window_size too large"));
        }
        Ok(())
    }
}

/// Parameters of the offset-histogram scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum height of the winning offset bucket
    pub min_matches: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { min_matches: 8 }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_matches == 0 {
            return Err(invalid("min_matches must be > 0"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> EchomarkError {
    EchomarkError::InvalidConfig(msg.to_string())
}
