//! Tests for offset-histogram matching

use super::*;
use crate::config::FingerprintConfig;

fn fp(hash: u64, anchor_time: u32) -> Fingerprint {
    Fingerprint { hash, anchor_time }
}

fn index_with(tracks: &[(TrackId, &[Fingerprint])]) -> CatalogIndex {
    let mut index = CatalogIndex::new(FingerprintConfig::default()).unwrap();
    for (id, fingerprints) in tracks {
        index
            .insert_fingerprints(*id, &format!("track {}", id), 10_000, fingerprints)
            .unwrap();
    }
    index
}

fn matching(min_matches: usize) -> MatchingConfig {
    MatchingConfig { min_matches }
}

/// Reference fingerprints: one distinct hash every 5 frames
fn reference(len: u32, seed: u64) -> Vec<Fingerprint> {
    (0..len).map(|i| fp(seed * 1_000 + i as u64, i * 5)).collect()
}

#[test]
fn test_matcher_basic() {
    let ref_fps = reference(40, 1);
    let index = index_with(&[(1, &ref_fps)]);

    // Query starts at reference frame 50
    let query: Vec<_> = ref_fps[10..30]
        .iter()
        .map(|f| fp(f.hash, f.anchor_time - 50))
        .collect();

    let result = Matcher::new(&index, &matching(8)).recognize_fingerprints(&query);
    let result = result.as_match().expect("should match");

    assert_eq!(result.track_id, 1);
    assert_eq!(result.title, "track 1");
    assert_eq!(result.score, 20);
    assert_eq!(result.offset_frames, 50);
    assert_eq!(result.distinct_hashes, 20);
    assert!((result.confidence - 1.0).abs() < 1e-9);

    let frame = FingerprintConfig::default().frame_duration();
    assert!((result.offset_seconds - 50.0 * frame).abs() < 1e-9);
    assert!((result.query_start - 0.0).abs() < 1e-9);
    assert!((result.query_stop - 95.0 * frame).abs() < 1e-9);
    assert!((result.ref_start - 50.0 * frame).abs() < 1e-9);
    assert!((result.ref_stop - 145.0 * frame).abs() < 1e-9);
}

#[test]
fn test_best_track_wins() {
    let a = reference(30, 1);
    let b = reference(30, 2);
    let index = index_with(&[(1, &a), (2, &b)]);

    // Mostly track 2 with a few stray hashes of track 1 at random offsets
    let mut query: Vec<_> = b[..20].to_vec();
    query.extend([fp(a[3].hash, 400), fp(a[9].hash, 2), fp(a[20].hash, 77)]);

    let candidates = Matcher::new(&index, &matching(1)).rank(&query);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].track_id, 2);
    assert_eq!(candidates[0].score, 20);
    assert_eq!(candidates[0].offset_frames, 0);
    assert_eq!(candidates[1].track_id, 1);
    assert_eq!(candidates[1].score, 1);
}

#[test]
fn test_negative_offset() {
    let ref_fps = reference(20, 3);
    let index = index_with(&[(7, &ref_fps)]);

    // Query is later in its own timeline than in the reference
    let query: Vec<_> = ref_fps.iter().map(|f| fp(f.hash, f.anchor_time + 12)).collect();
    let candidates = Matcher::new(&index, &matching(1)).rank(&query);

    assert_eq!(candidates[0].offset_frames, -12);
    assert_eq!(candidates[0].score, 20);
}

#[test]
fn test_below_threshold_is_no_match() {
    let ref_fps = reference(40, 1);
    let index = index_with(&[(1, &ref_fps)]);
    let query = ref_fps[..5].to_vec();

    let result = Matcher::new(&index, &matching(8)).recognize_fingerprints(&query);
    assert_eq!(
        result,
        Recognition::NoMatch {
            query_hashes: 5,
            best_score: 5
        }
    );
    assert!(!result.is_match());
}

#[test]
fn test_unknown_hashes_are_no_match() {
    let index = index_with(&[(1, &reference(40, 1))]);
    let query = reference(40, 9);

    let result = Matcher::new(&index, &matching(1)).recognize_fingerprints(&query);
    assert_eq!(
        result,
        Recognition::NoMatch {
            query_hashes: 40,
            best_score: 0
        }
    );
}

#[test]
fn test_empty_query_and_empty_index() {
    let index = index_with(&[]);
    let matcher = Matcher::new(&index, &matching(1));
    assert!(matcher.rank(&[]).is_empty());
    assert!(!matcher.recognize_fingerprints(&reference(10, 1)).is_match());
}

#[test]
fn test_tie_prefers_smallest_offset() {
    // Same hash at 10 and 30: the query hash votes once for each offset
    let index = index_with(&[(1, &[fp(5, 10), fp(5, 30)])]);
    let candidates = Matcher::new(&index, &matching(1)).rank(&[fp(5, 0)]);

    assert_eq!(candidates[0].score, 1);
    assert_eq!(candidates[0].offset_frames, 10);
}

#[test]
fn test_tie_broken_by_distinct_hashes() {
    // Track 1 reaches score 2 with one repeated hash, track 2 with two hashes
    let index = index_with(&[
        (1, &[fp(7, 10), fp(7, 11)]),
        (2, &[fp(7, 20), fp(8, 21)]),
    ]);
    let query = [fp(7, 0), fp(7, 1), fp(8, 1)];

    let candidates = Matcher::new(&index, &matching(1)).rank(&query);
    assert_eq!(candidates[0].track_id, 2);
    assert_eq!((candidates[0].score, candidates[0].distinct_hashes), (2, 2));
    assert_eq!(candidates[1].track_id, 1);
    assert_eq!((candidates[1].score, candidates[1].distinct_hashes), (2, 1));
}

#[test]
fn test_tie_broken_by_track_id() {
    let fps = reference(10, 4);
    // Insert the higher id first
    let index = index_with(&[(9, &fps), (4, &fps)]);

    let result = Matcher::new(&index, &matching(1)).recognize_fingerprints(&fps);
    assert_eq!(result.as_match().unwrap().track_id, 4);
}

#[test]
fn test_duplicate_query_hashes_all_vote() {
    // A repeated motif: the same hash occurs twice in query and reference
    let index = index_with(&[(1, &[fp(3, 100), fp(3, 150), fp(4, 120)])]);
    let query = [fp(3, 0), fp(3, 50), fp(4, 20)];

    let candidates = Matcher::new(&index, &matching(1)).rank(&query);
    assert_eq!(candidates[0].offset_frames, 100);
    assert_eq!(candidates[0].score, 3);
    assert_eq!(candidates[0].distinct_hashes, 2);
}
