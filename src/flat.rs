//! Exact brute-force nearest-neighbor index.
//!
//! Compares the query against every stored vector, so a search costs
//! O(N·D). Results are exact and deterministic: the same store and query
//! always produce the same ordered result.

use crate::error::Result;
use crate::store::VectorStore;
use crate::vector::{rank_top_k, Metric};
use serde::{Deserialize, Serialize};

/// One search hit: a stored identifier plus its score under the index
/// metric (a distance for squared L2, a similarity for inner product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub identifier: String,
    pub distance: f32,
}

/// Exact exhaustive index over a [`VectorStore`] snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    metric: Metric,
    store: VectorStore,
}

impl FlatIndex {
    /// Builds the index over `store`. O(1): the store is captured as-is.
    pub fn build(store: VectorStore, metric: Metric) -> FlatIndex {
        FlatIndex { metric, store }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Appends an embedding to the underlying store. Later searches see it
    /// immediately; no rebuild step exists for a flat index.
    pub fn append(&mut self, identifier: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        self.store.append(identifier, embedding)
    }

    /// Exhaustive top-k search.
    ///
    /// An empty store yields an empty result rather than an error, and
    /// `k` larger than the store yields every stored vector. Ties are
    /// broken by insertion order, first-inserted first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        self.store.check_dimension(query)?;

        let scored: Vec<(usize, f32)> = (0..self.store.len())
            .map(|pos| (pos, self.metric.score(query, self.store.embedding(pos))))
            .collect();

        Ok(rank_top_k(self.metric, scored, k)
            .into_iter()
            .map(|(pos, distance)| Neighbor {
                identifier: self.store.identifier(pos).to_string(),
                distance,
            })
            .collect())
    }
}
