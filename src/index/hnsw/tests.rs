use super::*;
use tempfile::TempDir;

fn small_config(dimension: usize) -> IndexConfig {
    IndexConfig {
        dimension,
        m: 8,
        ef_construction: 64,
        ef_search: 32,
    }
}

/// Deterministic pseudo-random vector, varied by seed.
fn test_vector(dimension: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15).wrapping_add(1);
    (0..dimension)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
        })
        .collect()
}

#[test]
fn empty_index_search() {
    let index = HnswIndex::new(&small_config(4));
    let results = index
        .search(&[0.0, 0.0, 0.0, 0.0], 5, 32)
        .expect("search should succeed on empty index");
    assert!(results.is_empty());
}

#[test]
fn insert_assigns_dense_ids() {
    let mut index = HnswIndex::new(&small_config(4));
    for i in 0..10u64 {
        let id = index.insert(test_vector(4, i)).expect("insert should succeed");
        assert_eq!(id, i as u32);
    }
    assert_eq!(index.len(), 10);
}

#[test]
fn dimension_mismatch_rejected() {
    let mut index = HnswIndex::new(&small_config(4));
    let result = index.insert(vec![1.0, 2.0]);
    assert!(matches!(result, Err(crate::RagError::Index(_))));

    index.insert(vec![0.0; 4]).expect("insert should succeed");
    let result = index.search(&[1.0, 2.0], 1, 16);
    assert!(matches!(result, Err(crate::RagError::Index(_))));
}

#[test]
fn self_is_nearest() {
    let mut index = HnswIndex::new(&small_config(16));
    for i in 0..100u64 {
        index.insert(test_vector(16, i)).expect("insert should succeed");
    }

    for i in [0u64, 17, 42, 99] {
        let query = test_vector(16, i);
        let results = index.search(&query, 3, 64).expect("search should succeed");
        assert_eq!(results[0].0, i as u32, "stored vector should be its own nearest neighbor");
        assert!(results[0].1 < 1e-6);
    }
}

#[test]
fn results_ascending_by_distance() {
    let mut index = HnswIndex::new(&small_config(8));
    for i in 0..50u64 {
        index.insert(test_vector(8, i)).expect("insert should succeed");
    }

    let results = index
        .search(&test_vector(8, 7), 10, 64)
        .expect("search should succeed");
    assert_eq!(results.len(), 10);
    for pair in results.windows(2) {
        assert!(pair[0].1 <= pair[1].1);
        assert!(pair[0].1 >= 0.0);
    }
}

#[test]
fn fewer_records_than_k() {
    let mut index = HnswIndex::new(&small_config(4));
    for i in 0..3u64 {
        index.insert(test_vector(4, i)).expect("insert should succeed");
    }

    let results = index
        .search(&test_vector(4, 0), 10, 32)
        .expect("search should succeed");
    assert_eq!(results.len(), 3);
}

#[test]
fn reconstruct_round_trips() {
    let mut index = HnswIndex::new(&small_config(8));
    let v = test_vector(8, 5);
    let id = index.insert(v.clone()).expect("insert should succeed");

    assert_eq!(index.reconstruct(id), Some(v.as_slice()));
    assert_eq!(index.reconstruct(99), None);
}

#[test]
fn level_distribution_is_geometric() {
    let mut index = HnswIndex::new(&small_config(4));
    let mut levels = [0u32; LEVEL_CAP as usize + 1];
    for _ in 0..10_000 {
        levels[index.select_level() as usize] += 1;
    }

    assert!(levels[0] > 5_000, "level 0 should dominate");
    assert!(levels[0] > levels[1]);
}

#[test]
fn save_load_round_trip() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("graph.index");

    let mut index = HnswIndex::new(&small_config(8));
    for i in 0..40u64 {
        index.insert(test_vector(8, i)).expect("insert should succeed");
    }
    index.save(&path).expect("save should succeed");

    let loaded = HnswIndex::load(&path).expect("load should succeed");
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.dimension(), index.dimension());
    assert_eq!(loaded.max_level(), index.max_level());
    assert_eq!(loaded.entry_point(), index.entry_point());

    let query = test_vector(8, 11);
    let before = index.search(&query, 5, 64).expect("search should succeed");
    let after = loaded.search(&query, 5, 64).expect("search should succeed");
    assert_eq!(before, after, "reloaded graph should reproduce search results exactly");
}

#[test]
fn load_missing_file_fails() {
    let dir = TempDir::new().expect("should create temp dir");
    let result = HnswIndex::load(&dir.path().join("nope.index"));
    assert!(result.is_err());
}
