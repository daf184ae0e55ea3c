use simdex::{ClusteredIndex, FlatIndex, Index, IndexKind, Metric, SearchOptions, VectorStore};
use tempfile::NamedTempFile;

fn random_vector(dim: usize, seed: u64) -> Vec<f32> {
    // Simple LCG pseudo-random generator (deterministic across runs)
    let mut state = seed;
    (0..dim)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            // Map to [-1.0, 1.0]
            ((state >> 33) as f32) / (u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

fn random_store(count: usize, dim: usize) -> VectorStore {
    let mut store = VectorStore::with_dimension(dim);
    for i in 0..count {
        store
            .append(format!("vec_{}", i), random_vector(dim, i as u64 + 1))
            .unwrap();
    }
    store
}

#[test]
fn test_full_probe_equals_flat_on_random_data() {
    let dim = 16;
    let count = 500;

    let flat = FlatIndex::build(random_store(count, dim), Metric::SquaredL2);
    let mut clustered = ClusteredIndex::build(random_store(count, dim), Metric::SquaredL2);
    clustered.train(8).unwrap();
    clustered.add().unwrap();

    for seed in 1000..1010u64 {
        let query = random_vector(dim, seed);
        let exact = flat.search(&query, 10).unwrap();
        let probed = clustered
            .search(&query, 10, clustered.num_clusters())
            .unwrap();
        assert_eq!(exact, probed, "full-probe search must be exhaustive");
    }
}

#[test]
fn test_probe_one_returns_subset_of_catalog() {
    let dim = 16;
    let count = 500;

    let mut clustered = ClusteredIndex::build(random_store(count, dim), Metric::InnerProduct);
    clustered.train(8).unwrap();
    clustered.add().unwrap();

    let query = random_vector(dim, 42_000);
    let results = clustered.search(&query, 10, 1).unwrap();

    // Approximate search still returns well-ordered results
    assert!(!results.is_empty());
    for pair in results.windows(2) {
        assert!(pair[0].distance >= pair[1].distance - 1e-6);
    }
}

#[test]
fn test_save_load_search_round_trip() {
    let dim = 32;
    let count = 2_000;

    let mut index = Index::new(IndexKind::Clustered, Metric::SquaredL2);
    for i in 0..count {
        index
            .append(format!("vec_{}", i), random_vector(dim, i as u64 + 1))
            .unwrap();
    }
    if let Index::Clustered(clustered) = &mut index {
        clustered.train(16).unwrap();
        clustered.add().unwrap();
    }

    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap();
    index.save(path).unwrap();

    let loaded = Index::load(path).unwrap();
    assert_eq!(loaded.len(), count);
    assert!(loaded.is_trained());

    let options = SearchOptions { k: 10, num_probe: 4 };
    for seed in 50_000..50_020u64 {
        let query = random_vector(dim, seed);
        let before = index.search(&query, &options).unwrap();
        let after = loaded.search(&query, &options).unwrap();
        assert_eq!(before, after, "loaded index must answer identically");
    }
}

#[test]
fn test_flat_save_load_large() {
    let dim = 64;
    let count = 5_000;

    let mut index = Index::new(IndexKind::Flat, Metric::InnerProduct);
    for i in 0..count {
        index
            .append(format!("vec_{}", i), random_vector(dim, i as u64 + 1))
            .unwrap();
    }

    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().to_str().unwrap();
    index.save(path).unwrap();

    let loaded = Index::load(path).unwrap();
    assert_eq!(loaded.len(), count);
    assert_eq!(loaded.dimension(), Some(dim));

    let query = random_vector(dim, 123_456);
    let before = index.search(&query, &SearchOptions::with_k(5)).unwrap();
    let after = loaded.search(&query, &SearchOptions::with_k(5)).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_recall_improves_with_more_probes() {
    let dim = 16;
    let count = 1_000;
    let k = 10;

    let flat = FlatIndex::build(random_store(count, dim), Metric::SquaredL2);
    let mut clustered = ClusteredIndex::build(random_store(count, dim), Metric::SquaredL2);
    clustered.train(16).unwrap();
    clustered.add().unwrap();

    let mut recall_single = 0usize;
    let mut recall_full = 0usize;
    let queries: Vec<Vec<f32>> = (9_000..9_050u64).map(|s| random_vector(dim, s)).collect();

    for query in &queries {
        let truth: Vec<String> = flat
            .search(query, k)
            .unwrap()
            .into_iter()
            .map(|n| n.identifier)
            .collect();

        let single = clustered.search(query, k, 1).unwrap();
        recall_single += single
            .iter()
            .filter(|n| truth.contains(&n.identifier))
            .count();

        let full = clustered
            .search(query, k, clustered.num_clusters())
            .unwrap();
        recall_full += full
            .iter()
            .filter(|n| truth.contains(&n.identifier))
            .count();
    }

    // Full probing is exhaustive, so recall is perfect; single-probe may
    // miss neighbors in unprobed clusters but never exceeds it.
    assert_eq!(recall_full, queries.len() * k);
    assert!(recall_single <= recall_full);
}
