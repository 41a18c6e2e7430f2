//! Short-time Fourier transform magnitude spectrogram

use crate::config::{FingerprintConfig, WindowFunction};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Spectrogram representation
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Magnitude values [time_frame][frequency_bin]
    pub magnitudes: Vec<Vec<f32>>,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of frequency bins (window_size / 2 + 1)
    pub num_bins: usize,
    pub window_size: usize,
    pub hop_size: usize,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    /// Start time of a frame in seconds
    pub fn frame_to_seconds(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_size as f64 / self.sample_rate as f64
    }

    /// Center frequency of a bin in Hz
    pub fn bin_to_hz(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.window_size as f64
    }
}

/// Compute the magnitude spectrogram of mono samples.
///
/// Only full windows are analysed, so input shorter than one window gives
/// an empty spectrogram.
pub fn compute_spectrogram(samples: &[f32], config: &FingerprintConfig) -> Spectrogram {
    let window_size = config.window_size;
    let hop_size = config.hop_size;
    let num_bins = config.num_bins();

    let num_frames = if samples.len() < window_size {
        0
    } else {
        (samples.len() - window_size) / hop_size + 1
    };

    let mut magnitudes = Vec::with_capacity(num_frames);

    if num_frames > 0 {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_size);
        let mut scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex::new(0.0, 0.0); window_size];

        let window = create_window(config.window, window_size);

        for frame_idx in 0..num_frames {
            let start = frame_idx * hop_size;
            let frame = &samples[start..start + window_size];

            for ((slot, &s), &w) in buffer.iter_mut().zip(frame).zip(&window) {
                *slot = Complex::new(s * w, 0.0);
            }

            fft.process_with_scratch(&mut buffer, &mut scratch);

            magnitudes.push(buffer[..num_bins].iter().map(|c| c.norm()).collect());
        }
    }

    Spectrogram {
        magnitudes,
        num_frames,
        num_bins,
        window_size,
        hop_size,
        sample_rate: config.sample_rate,
    }
}

/// Create a symmetric analysis window
pub fn create_window(function: WindowFunction, size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }

    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            match function {
                WindowFunction::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                WindowFunction::Blackman => {
                    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                }
                WindowFunction::Rectangular => 1.0,
            }
        })
        .collect()
}
