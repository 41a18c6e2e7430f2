//! Mono sample buffers handed to the extraction pipeline

use crate::audio::resample_to_target;
use crate::error::Result;

/// A mono waveform at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> u32 {
        (self.duration_secs() * 1000.0) as u32
    }

    /// Copy of the waveform at `sample_rate`
    pub fn resampled(&self, sample_rate: u32) -> Result<Waveform> {
        Ok(Waveform {
            samples: resample_to_target(&self.samples, self.sample_rate, sample_rate)?,
            sample_rate,
        })
    }

    /// Copy of `[start, start + duration)` seconds, clipped to the waveform
    pub fn excerpt(&self, start_secs: f64, duration_secs: Option<f64>) -> Waveform {
        let rate = self.sample_rate as f64;
        let start = ((start_secs.max(0.0) * rate) as usize).min(self.samples.len());
        let end = match duration_secs {
            Some(d) => (start + (d.max(0.0) * rate) as usize).min(self.samples.len()),
            None => self.samples.len(),
        };

        Waveform {
            samples: self.samples[start..end].to_vec(),
            sample_rate: self.sample_rate,
        }
    }
}
