//! The query service: a thin orchestration layer over both index kinds.
//!
//! Validates query dimensions, dispatches batched searches, and produces
//! the batch similarity report consumed by the "similar images" scripts.

use crate::clustered::{ClusteredIndex, DEFAULT_NUM_PROBE};
use crate::error::Result;
use crate::flat::{FlatIndex, Neighbor};
use crate::store::VectorStore;
use crate::vector::Metric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Neighbors returned per query when the caller does not say.
pub const DEFAULT_TOP_K: usize = 5;

/// Which index implementation backs a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    #[default]
    Flat,
    Clustered,
}

/// Either index implementation behind one concrete type, so the service,
/// the persistence layer, and the HTTP layer all handle a single enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Index {
    Flat(FlatIndex),
    Clustered(ClusteredIndex),
}

impl Index {
    /// Builds an empty index of the requested kind and metric.
    pub fn new(kind: IndexKind, metric: Metric) -> Index {
        match kind {
            IndexKind::Flat => Index::Flat(FlatIndex::build(VectorStore::new(), metric)),
            IndexKind::Clustered => {
                Index::Clustered(ClusteredIndex::build(VectorStore::new(), metric))
            }
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Index::Flat(_) => IndexKind::Flat,
            Index::Clustered(_) => IndexKind::Clustered,
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            Index::Flat(index) => index.metric(),
            Index::Clustered(index) => index.metric(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Index::Flat(index) => index.len(),
            Index::Clustered(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> Option<usize> {
        match self {
            Index::Flat(index) => index.store().dimension(),
            Index::Clustered(index) => index.store().dimension(),
        }
    }

    /// A flat index is always ready; a clustered one only after training.
    pub fn is_trained(&self) -> bool {
        match self {
            Index::Flat(_) => true,
            Index::Clustered(index) => index.is_trained(),
        }
    }

    /// Positional lookup into the underlying store.
    pub fn get(&self, position: usize) -> Result<(&[f32], &str)> {
        match self {
            Index::Flat(index) => index.store().get(position),
            Index::Clustered(index) => index.store().get(position),
        }
    }

    pub fn append(&mut self, identifier: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        match self {
            Index::Flat(index) => index.append(identifier, embedding),
            Index::Clustered(index) => index.append(identifier, embedding),
        }
    }

    /// Top-k search. `num_probe` only applies to the clustered variant.
    pub fn search(&self, query: &[f32], options: &SearchOptions) -> Result<Vec<Neighbor>> {
        match self {
            Index::Flat(index) => index.search(query, options.k),
            Index::Clustered(index) => index.search(query, options.k, options.num_probe),
        }
    }
}

/// Per-search tuning: how many neighbors, and for the clustered index how
/// many clusters to probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchOptions {
    pub k: usize,
    pub num_probe: usize,
}

impl Default for SearchOptions {
    fn default() -> SearchOptions {
        SearchOptions {
            k: DEFAULT_TOP_K,
            num_probe: DEFAULT_NUM_PROBE,
        }
    }
}

impl SearchOptions {
    pub fn with_k(k: usize) -> SearchOptions {
        SearchOptions {
            k,
            ..SearchOptions::default()
        }
    }
}

/// Read-only handle over a built index answering batched queries.
pub struct QueryService<'a> {
    index: &'a Index,
}

impl<'a> QueryService<'a> {
    pub fn new(index: &'a Index) -> QueryService<'a> {
        QueryService { index }
    }

    /// Runs every query in order and returns one result list per query,
    /// in the same order as the input. The first invalid query fails the
    /// whole batch; nothing is partially returned.
    pub fn search_batch(
        &self,
        queries: &[Vec<f32>],
        options: &SearchOptions,
    ) -> Result<Vec<Vec<Neighbor>>> {
        queries
            .iter()
            .map(|query| self.index.search(query, options))
            .collect()
    }

    /// Batch similarity report: maps each query identifier to the ordered
    /// identifiers of its matches. This is the shape the "similar images"
    /// batch scripts persist for humans to read.
    pub fn similarity_report(
        &self,
        queries: &[(String, Vec<f32>)],
        options: &SearchOptions,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut report = BTreeMap::new();
        for (identifier, query) in queries {
            let matches = self.index.search(query, options)?;
            report.insert(
                identifier.clone(),
                matches.into_iter().map(|n| n.identifier).collect(),
            );
        }
        Ok(report)
    }
}

/// Writes a similarity report as pretty-printed JSON, one entry per query
/// identifier.
pub fn write_similarity_report(
    report: &BTreeMap<String, Vec<String>>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}

#[cfg(test)]
mod query_test {
    use super::*;

    fn flat_index() -> Index {
        let mut index = Index::new(IndexKind::Flat, Metric::SquaredL2);
        index.append("a", vec![1.0, 0.0]).unwrap();
        index.append("b", vec![0.0, 1.0]).unwrap();
        index.append("c", vec![0.9, 0.1]).unwrap();
        index
    }

    #[test]
    fn test_batch_results_preserve_query_order() {
        let index = flat_index();
        let service = QueryService::new(&index);

        let queries = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let results = service
            .search_batch(&queries, &SearchOptions::with_k(1))
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0][0].identifier, "a");
        assert_eq!(results[1][0].identifier, "b");
    }

    #[test]
    fn test_batch_rejects_bad_dimension() {
        let index = flat_index();
        let service = QueryService::new(&index);

        let queries = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        assert!(service
            .search_batch(&queries, &SearchOptions::default())
            .is_err());
    }

    #[test]
    fn test_batch_on_empty_index() {
        let index = Index::new(IndexKind::Flat, Metric::SquaredL2);
        let service = QueryService::new(&index);

        let results = service
            .search_batch(&[vec![1.0, 0.0]], &SearchOptions::default())
            .unwrap();
        assert_eq!(results, vec![Vec::new()]);
    }

    #[test]
    fn test_similarity_report_shape() {
        let index = flat_index();
        let service = QueryService::new(&index);

        let queries = vec![
            ("query1.jpg".to_string(), vec![1.0, 0.0]),
            ("query2.jpg".to_string(), vec![0.0, 1.0]),
        ];
        let report = service
            .similarity_report(&queries, &SearchOptions::with_k(2))
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report["query1.jpg"], vec!["a", "c"]);
        assert_eq!(report["query2.jpg"][0], "b");
    }

    #[test]
    fn test_write_similarity_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("similar_images.json");

        let index = flat_index();
        let service = QueryService::new(&index);
        let queries = vec![("q.jpg".to_string(), vec![1.0, 0.0])];
        let report = service
            .similarity_report(&queries, &SearchOptions::with_k(2))
            .unwrap();

        write_similarity_report(&report, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_index_state_reporting() {
        let index = flat_index();
        assert_eq!(index.kind(), IndexKind::Flat);
        assert_eq!(index.metric(), Metric::SquaredL2);
        assert_eq!(index.dimension(), Some(2));
        assert!(index.is_trained());

        let clustered = Index::new(IndexKind::Clustered, Metric::InnerProduct);
        assert!(!clustered.is_trained());
        assert!(clustered.is_empty());
    }

    #[test]
    fn test_clustered_index_through_service() {
        let mut index = Index::new(IndexKind::Clustered, Metric::SquaredL2);
        for (id, v) in [
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.9, 0.1]),
            ("c", vec![0.0, 1.0]),
            ("d", vec![0.1, 0.9]),
        ] {
            index.append(id, v).unwrap();
        }

        if let Index::Clustered(clustered) = &mut index {
            clustered.train(2).unwrap();
            clustered.add().unwrap();
        }

        let service = QueryService::new(&index);
        let options = SearchOptions {
            k: 2,
            num_probe: 2,
        };
        let results = service.search_batch(&[vec![1.0, 0.0]], &options).unwrap();
        assert_eq!(results[0][0].identifier, "a");
    }
}
