//! Band-limited resampling with rubato's sinc interpolator
//!
//! Content above the target Nyquist frequency is filtered out instead of
//! folding back into the analysis band. The output is delay-compensated, so
//! sample `i` of the result lines up with time `i / to_rate` of the input.

use crate::error::{EchomarkError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames fed to the resampler per call
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio from `from_rate` to `to_rate`
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(EchomarkError::InvalidConfig(format!(
            "cannot resample {} Hz to {} Hz",
            from_rate, to_rate
        )));
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        oversampling_factor: 64,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| resample_error(from_rate, to_rate, e))?;

    let expected_len = (samples.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);

    let mut chunks = samples.chunks_exact(CHUNK_SIZE);
    for chunk in &mut chunks {
        let out = resampler
            .process(&[chunk], None)
            .map_err(|e| resample_error(from_rate, to_rate, e))?;
        output.extend_from_slice(&out[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let out = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(|e| resample_error(from_rate, to_rate, e))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the filter tail
    while output.len() < delay + expected_len {
        let out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| resample_error(from_rate, to_rate, e))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected_len);
    Ok(output)
}

fn resample_error(from_rate: u32, to_rate: u32, err: impl std::fmt::Display) -> EchomarkError {
    EchomarkError::InvalidConfig(format!(
        "cannot resample {} Hz to {} Hz: {}",
        from_rate, to_rate, err
    ))
}
