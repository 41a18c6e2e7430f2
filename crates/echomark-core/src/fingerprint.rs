//! Fingerprint generation and hashing
//!
//! Each landmark (the anchor) is paired with the landmarks of its target
//! zone. A pair hashes the two frequency bins and the frame distance into a
//! single `u64`; the absolute position only survives as the anchor time.

use crate::config::FingerprintConfig;
use crate::landmark::Landmark;
use serde::{Deserialize, Serialize};

/// A hash and the frame of the landmark it is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: u64,
    pub anchor_time: u32,
}

/// Bit layout `f1 | f2 | dt`, most significant first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashLayout {
    freq_bits: u32,
    delta_bits: u32,
}

impl HashLayout {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self {
            freq_bits: config.hash_freq_bits,
            delta_bits: config.hash_delta_bits,
        }
    }

    pub fn encode(&self, f1: u16, f2: u16, dt: u32) -> u64 {
        let freq_mask = mask(self.freq_bits);
        let delta_mask = mask(self.delta_bits);

        ((f1 as u64 & freq_mask) << (self.freq_bits + self.delta_bits))
            | ((f2 as u64 & freq_mask) << self.delta_bits)
            | (dt as u64 & delta_mask)
    }

    pub fn decode(&self, hash: u64) -> (u16, u16, u32) {
        let freq_mask = mask(self.freq_bits);
        let f1 = (hash >> (self.freq_bits + self.delta_bits)) & freq_mask;
        let f2 = (hash >> self.delta_bits) & freq_mask;
        let dt = hash & mask(self.delta_bits);
        (f1 as u16, f2 as u16, dt as u32)
    }
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Fingerprint generator
pub struct FingerprintGenerator {
    layout: HashLayout,
    target_zone_size: usize,
    min_time_delta: u32,
    max_time_delta: u32,
}

impl FingerprintGenerator {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self {
            layout: HashLayout::new(config),
            target_zone_size: config.target_zone_size,
            min_time_delta: config.min_time_delta,
            max_time_delta: config.max_time_delta,
        }
    }

    /// Generate fingerprints from landmarks ordered by time.
    ///
    /// Output is ordered by anchor time; identical hashes from different
    /// pairs are all kept.
    pub fn generate(&self, landmarks: &[Landmark]) -> Vec<Fingerprint> {
        let mut fingerprints = Vec::new();

        for (i, anchor) in landmarks.iter().enumerate() {
            for target in landmarks.iter().skip(i + 1).take(self.target_zone_size) {
                let dt = target.t.saturating_sub(anchor.t);
                if dt > self.max_time_delta {
                    break;
                }
                if dt < self.min_time_delta {
                    continue;
                }

                fingerprints.push(Fingerprint {
                    hash: self.layout.encode(anchor.f, target.f, dt),
                    anchor_time: anchor.t,
                });
            }
        }

        fingerprints
    }
}
