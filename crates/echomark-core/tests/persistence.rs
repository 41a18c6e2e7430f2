//! Saving, loading and decoding from disk

mod common;

use common::{catalog, percussive_track, ANALYSIS_RATE};
use echomark_core::audio::decode_audio;
use echomark_core::settings::{IndexFormat, IndexStorageConfig};
use echomark_core::{
    load_index, load_index_from_path, recognize, save_index, save_index_to_path, CatalogIndex,
    EchomarkError, FingerprintConfig, MatchingConfig, Track,
};
use echomark_index::Encoding;
use std::path::Path;

fn sample_index() -> CatalogIndex {
    let (index, _) = CatalogIndex::build(catalog(3, 12.0), FingerprintConfig::default()).unwrap();
    index
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_saved_index_recognizes_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let index = sample_index();
    let clip = catalog(3, 12.0)[1].waveform.excerpt(5.0, Some(5.0));

    for format in [IndexFormat::Binary, IndexFormat::Json] {
        let storage = IndexStorageConfig {
            format,
            ..IndexStorageConfig::default()
        };
        let path = dir.path().join(format!("{:?}.idx", format));
        save_index_to_path(&index, &path, &storage).unwrap();

        let loaded = load_index_from_path(&path).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(
            recognize(&loaded, &clip, &MatchingConfig::default()).unwrap(),
            recognize(&index, &clip, &MatchingConfig::default()).unwrap()
        );
    }
}

#[test]
fn test_corruption_anywhere_is_reported() {
    let bytes = save_index(&sample_index(), Encoding::Binary { compress: true }).unwrap();

    for position in [0, 5, 20, 47, 48, bytes.len() / 2, bytes.len() - 1] {
        let mut damaged = bytes.clone();
        damaged[position] ^= 0xA5;
        let err = load_index(&damaged).unwrap_err();
        assert!(
            matches!(err, EchomarkError::IndexCorruption(_)),
            "byte {}: {:?}",
            position,
            err
        );
    }

    assert!(matches!(
        load_index(&[]),
        Err(EchomarkError::IndexCorruption(_))
    ));
}

#[test]
fn test_append_then_save_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.idx");
    let storage = IndexStorageConfig::default();

    save_index_to_path(&sample_index(), &path, &storage).unwrap();

    let mut index = load_index_from_path(&path).unwrap();
    let id = index.next_track_id();
    let late = Track::new(id, "appended", percussive_track(77, 12.0, ANALYSIS_RATE));
    let clip = late.waveform.excerpt(2.0, Some(5.0));
    index.add_track(late).unwrap();
    save_index_to_path(&index, &path, &storage).unwrap();

    let reloaded = load_index_from_path(&path).unwrap();
    assert_eq!(reloaded.num_tracks(), 4);
    let result = recognize(&reloaded, &clip, &MatchingConfig::default()).unwrap();
    assert_eq!(result.as_match().map(|m| m.track_id), Some(3));
}

#[test]
fn test_recognize_decoded_wav_file() {
    let dir = tempfile::tempdir().unwrap();
    let track = percussive_track(31, 20.0, 22_050);
    let clip = track.excerpt(8.0, Some(5.0));

    let track_path = dir.path().join("track.wav");
    let clip_path = dir.path().join("clip.WAV");
    write_wav(&track_path, &track.samples, track.sample_rate);
    write_wav(&clip_path, &clip.samples, clip.sample_rate);

    let config = FingerprintConfig::default();
    let decoded = decode_audio(&track_path, config.sample_rate).unwrap();
    assert_eq!(decoded.sample_rate, config.sample_rate);

    let mut index = CatalogIndex::new(config.clone()).unwrap();
    index
        .add_track(Track::new(0, "track.wav", decoded.into_waveform()))
        .unwrap();

    let query = decode_audio(&clip_path, config.sample_rate)
        .unwrap()
        .into_waveform();
    let result = recognize(&index, &query, &MatchingConfig::default()).unwrap();
    let result = result.as_match().expect("decoded clip should be recognized");
    assert_eq!(result.track_id, 0);
    assert!((result.offset_seconds - 8.0).abs() <= config.frame_duration());
}
