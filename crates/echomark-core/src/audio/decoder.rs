//! Audio decoding for multiple formats

use super::{probe, resample_to_target, AudioFormat};
use crate::error::{EchomarkError, Result};
use crate::waveform::Waveform;
use anyhow::Context;
use std::io::Cursor;
use std::path::Path;

/// Decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    pub(super) fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> anyhow::Result<Self> {
        if sample_rate == 0 || channels == 0 {
            anyhow::bail!("stream reports {} Hz with {} channels", sample_rate, channels);
        }
        if samples.is_empty() {
            anyhow::bail!("no audio samples decoded");
        }

        let duration_ms =
            (samples.len() as f64 / (sample_rate as f64 * channels as f64) * 1000.0) as u32;

        Ok(Self {
            samples,
            sample_rate,
            channels,
            duration_ms,
        })
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    /// Mono waveform at the decoded sample rate
    pub fn into_waveform(self) -> Waveform {
        let samples = if self.channels == 1 {
            self.samples
        } else {
            self.to_mono()
        };
        Waveform::new(samples, self.sample_rate)
    }

    /// Down-mix to mono and resample to `target_sample_rate`
    fn conform(mut self, target_sample_rate: u32) -> Result<Self> {
        if self.channels > 1 {
            self.samples = self.to_mono();
            self.channels = 1;
        }
        if self.sample_rate != target_sample_rate {
            self.samples =
                resample_to_target(&self.samples, self.sample_rate, target_sample_rate)?;
            self.sample_rate = target_sample_rate;
        }
        Ok(self)
    }
}

/// Decode an audio file to mono at `target_sample_rate`
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> Result<AudioData> {
    let bytes = std::fs::read(path)?;

    let mut format = AudioFormat::from_path(path);
    if format == AudioFormat::Unknown {
        format = AudioFormat::sniff(&bytes);
    }
    let hint = path.extension().and_then(|e| e.to_str());

    let audio = decode_with_format(&bytes, format, hint).map_err(|e| EchomarkError::Decoding {
        origin: path.display().to_string(),
        reason: format!("{:#}", e),
    })?;

    log::debug!(
        "Decoded {}: {:?}, {} Hz, {} channel(s), {} ms",
        path.display(),
        format,
        audio.sample_rate,
        audio.channels,
        audio.duration_ms
    );

    audio.conform(target_sample_rate)
}

/// Decode an in-memory audio file to mono at `target_sample_rate`
pub fn decode_audio_bytes(bytes: &[u8], target_sample_rate: u32) -> Result<AudioData> {
    let format = AudioFormat::sniff(bytes);

    let audio = decode_with_format(bytes, format, None).map_err(|e| EchomarkError::Decoding {
        origin: "<bytes>".to_string(),
        reason: format!("{:#}", e),
    })?;

    audio.conform(target_sample_rate)
}

fn decode_with_format(
    bytes: &[u8],
    format: AudioFormat,
    hint: Option<&str>,
) -> anyhow::Result<AudioData> {
    match format {
        AudioFormat::Wav => decode_wav(bytes),
        AudioFormat::Mp3 => decode_mp3(bytes),
        AudioFormat::Flac => decode_flac(bytes),
        AudioFormat::Ogg => decode_ogg(bytes),
        AudioFormat::Container | AudioFormat::Unknown => {
            probe::decode_with_symphonia(bytes.to_vec(), hint)
        }
    }
}

/// Decode WAV data
fn decode_wav(bytes: &[u8]) -> anyhow::Result<AudioData> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("invalid WAV header")?;

    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("corrupt WAV sample data")?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("corrupt WAV sample data")?
        }
    };

    AudioData::new(samples, spec.sample_rate, spec.channels)
}

/// Decode MP3 data
fn decode_mp3(bytes: &[u8]) -> anyhow::Result<AudioData> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("MP3 decode error: {}", e),
        }
    }

    AudioData::new(samples, sample_rate, channels)
}

/// Decode FLAC data
fn decode_flac(bytes: &[u8]) -> anyhow::Result<AudioData> {
    let mut reader = claxon::FlacReader::new(Cursor::new(bytes)).context("invalid FLAC stream")?;

    let info = reader.streaminfo();
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;

    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("corrupt FLAC frame")?;

    AudioData::new(samples, info.sample_rate, info.channels as u16)
}

/// Decode OGG Vorbis data
fn decode_ogg(bytes: &[u8]) -> anyhow::Result<AudioData> {
    let mut reader = lewton::inside_ogg::OggStreamReader::new(Cursor::new(bytes))
        .context("invalid OGG Vorbis stream")?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader
        .read_dec_packet_itl()
        .context("corrupt Vorbis packet")?
    {
        samples.extend(packet.iter().map(|&s| s as f32 / 32768.0));
    }

    AudioData::new(samples, sample_rate, channels)
}
