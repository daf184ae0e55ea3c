//! Clustered (inverted-file) approximate nearest-neighbor index.
//!
//! Trades recall for speed: a k-means coarse quantizer partitions the space
//! into clusters, and a search only scans vectors assigned to the
//! `num_probe` clusters nearest the query. Probing every cluster degrades
//! to the exact flat scan.
//!
//! Lifecycle is an explicit state machine: `build` → `train` → `add` →
//! `search`. Searching or populating before training fails with
//! [`SimdexError::IndexNotTrained`].

use crate::error::{Result, SimdexError};
use crate::flat::Neighbor;
use crate::store::VectorStore;
use crate::vector::{normalized_or_zero, rank_top_k, squared_l2, Metric};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Clusters probed per search unless the caller says otherwise. One probe
/// is the fastest and least accurate setting; raise it toward the cluster
/// count to trade speed back for recall.
pub const DEFAULT_NUM_PROBE: usize = 1;

/// Iteration cap for the k-means training loop.
const MAX_ITERATIONS: usize = 100;

/// Approximate index over a [`VectorStore`] with a trained coarse quantizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteredIndex {
    metric: Metric,
    store: VectorStore,
    centroids: Vec<Vec<f32>>,
    assignments: Vec<u32>,
}

impl ClusteredIndex {
    /// Builds an untrained index over `store`.
    pub fn build(store: VectorStore, metric: Metric) -> ClusteredIndex {
        ClusteredIndex {
            metric,
            store,
            centroids: Vec::new(),
            assignments: Vec::new(),
        }
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

    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Appends an embedding to the underlying store.
    ///
    /// Centroids are NOT retrained and the new vector is not assigned to a
    /// cluster until the next [`add`](ClusteredIndex::add) call; until then
    /// it is invisible to searches. Appending after training leaves the
    /// centroids stale, which is accepted: retrain explicitly or accept
    /// degraded recall for the new vectors.
    pub fn append(&mut self, identifier: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        self.store.append(identifier, embedding)
    }

    /// Trains the coarse quantizer on every vector currently in the store.
    ///
    /// Runs k-means under the index metric: k-means++ seeding, then
    /// assign/recompute rounds until assignments stabilize or the iteration
    /// cap is hit. Fails with [`SimdexError::InsufficientSamples`] when the
    /// store holds fewer vectors than the requested cluster count (or the
    /// count is zero); no partial centroids are produced.
    ///
    /// Training resets all cluster assignments; call
    /// [`add`](ClusteredIndex::add) afterwards to populate the index.
    pub fn train(&mut self, num_clusters: usize) -> Result<()> {
        let samples = self.store.len();
        if num_clusters == 0 || samples < num_clusters {
            return Err(SimdexError::InsufficientSamples {
                samples,
                clusters: num_clusters,
            });
        }

        log::info!(
            "training {} clusters over {} vectors",
            num_clusters,
            samples
        );

        self.centroids = kmeans(&self.store, self.metric, num_clusters);
        self.assignments.clear();
        Ok(())
    }

    /// Assigns every not-yet-assigned stored vector to its nearest centroid.
    ///
    /// Safe to call repeatedly: already-assigned vectors keep their cluster,
    /// so a call after further appends only extends the assignment list
    /// (against the possibly stale centroids). O(pending · clusters · D).
    pub fn add(&mut self) -> Result<()> {
        if !self.is_trained() {
            return Err(SimdexError::IndexNotTrained);
        }

        for pos in self.assignments.len()..self.store.len() {
            let cluster = nearest_centroid(self.metric, self.store.embedding(pos), &self.centroids);
            self.assignments.push(cluster as u32);
        }
        Ok(())
    }

    /// Approximate top-k search probing the `num_probe` clusters nearest to
    /// the query (clamped to `1..=num_clusters`).
    ///
    /// Only vectors assigned by [`add`](ClusteredIndex::add) are candidates.
    /// The true global top-k may be missed when it lives in an unprobed
    /// cluster; probing all clusters returns exactly the flat-index result.
    pub fn search(&self, query: &[f32], k: usize, num_probe: usize) -> Result<Vec<Neighbor>> {
        if !self.is_trained() {
            return Err(SimdexError::IndexNotTrained);
        }

        self.store.check_dimension(query)?;

        if self.assignments.is_empty() {
            return Ok(Vec::new());
        }

        let probes = num_probe.clamp(1, self.centroids.len());
        let centroid_scores: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.metric.score(query, c)))
            .collect();
        let probed: Vec<u32> = rank_top_k(self.metric, centroid_scores, probes)
            .into_iter()
            .map(|(cluster, _)| cluster as u32)
            .collect();

        // Candidates are gathered in position order so ties stay stable.
        let scored: Vec<(usize, f32)> = self
            .assignments
            .iter()
            .enumerate()
            .filter(|&(_, cluster)| probed.contains(cluster))
            .map(|(pos, _)| (pos, self.metric.score(query, self.store.embedding(pos))))
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

/// Divergence used to weight k-means++ seeding: squared L2 distance, or
/// cosine distance for the inner-product metric.
fn divergence(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::SquaredL2 => squared_l2(a, b),
        Metric::InnerProduct => (1.0 - metric.score(a, b)).max(0.0),
    }
}

/// Prepares a stored vector for use as a centroid seed. Inner-product
/// centroids live on the unit sphere.
fn centroid_seed(metric: Metric, vector: &[f32]) -> Vec<f32> {
    match metric {
        Metric::SquaredL2 => vector.to_vec(),
        Metric::InnerProduct => normalized_or_zero(vector),
    }
}

/// Index of the centroid most similar to `vector` under `metric`.
fn nearest_centroid(metric: Metric, vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_score = metric.score(vector, &centroids[0]);

    for (i, centroid) in centroids.iter().enumerate().skip(1) {
        let score = metric.score(vector, centroid);
        if metric.better(score, best_score) {
            best = i;
            best_score = score;
        }
    }

    best
}

/// K-means++ seeding: the first centroid is a random sample, each further
/// centroid is drawn with probability proportional to its divergence from
/// the nearest already-chosen centroid.
fn init_centroids(
    store: &VectorStore,
    metric: Metric,
    k: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    let first = rng.random_range(0..store.len());
    centroids.push(centroid_seed(metric, store.embedding(first)));

    while centroids.len() < k {
        let mut weights = Vec::with_capacity(store.len());
        let mut total = 0.0f32;

        for pos in 0..store.len() {
            let vector = store.embedding(pos);
            let nearest = centroids
                .iter()
                .map(|c| divergence(metric, vector, c))
                .fold(f32::INFINITY, f32::min);
            weights.push(nearest);
            total += nearest;
        }

        if total <= f32::EPSILON {
            // Every sample coincides with an existing centroid; any pick works.
            let pos = rng.random_range(0..store.len());
            centroids.push(centroid_seed(metric, store.embedding(pos)));
            continue;
        }

        let target = rng.random::<f32>() * total;
        let mut cumulative = 0.0;
        let mut chosen = store.len() - 1;
        for (pos, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if cumulative >= target {
                chosen = pos;
                break;
            }
        }
        centroids.push(centroid_seed(metric, store.embedding(chosen)));
    }

    centroids
}

/// Recomputes each centroid as the mean of its assigned vectors. Empty
/// clusters are reseeded from a random sample.
fn update_centroids(
    store: &VectorStore,
    metric: Metric,
    assignments: &[usize],
    k: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<f32>> {
    let dim = store.embedding(0).len();
    let mut sums = vec![vec![0.0f32; dim]; k];
    let mut counts = vec![0usize; k];

    for (pos, &cluster) in assignments.iter().enumerate() {
        for (acc, value) in sums[cluster].iter_mut().zip(store.embedding(pos)) {
            *acc += value;
        }
        counts[cluster] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(mut sum, count)| {
            if count == 0 {
                let pos = rng.random_range(0..store.len());
                return centroid_seed(metric, store.embedding(pos));
            }

            for value in sum.iter_mut() {
                *value /= count as f32;
            }

            match metric {
                Metric::SquaredL2 => sum,
                Metric::InnerProduct => normalized_or_zero(&sum),
            }
        })
        .collect()
}

/// Iterative k-means under `metric`: assign every vector to its nearest
/// centroid, recompute centroids as cluster means, stop when assignments
/// stabilize or after [`MAX_ITERATIONS`] rounds.
fn kmeans(store: &VectorStore, metric: Metric, k: usize) -> Vec<Vec<f32>> {
    let mut rng = rand::rng();
    let mut centroids = init_centroids(store, metric, k, &mut rng);
    let mut assignments = vec![usize::MAX; store.len()];
    let mut iterations = 0;

    loop {
        let new_assignments: Vec<usize> = (0..store.len())
            .map(|pos| nearest_centroid(metric, store.embedding(pos), &centroids))
            .collect();

        if new_assignments == assignments {
            break;
        }
        assignments = new_assignments;

        centroids = update_centroids(store, metric, &assignments, k, &mut rng);

        iterations += 1;
        if iterations >= MAX_ITERATIONS {
            log::warn!("k-means hit the {MAX_ITERATIONS}-iteration cap before converging");
            break;
        }
    }

    centroids
}
