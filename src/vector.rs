//! Vector math and distance metrics.
//!
//! Provides L2 normalization, dot product, squared L2 distance, and the
//! pluggable [`Metric`] every index is constructed with.

use crate::error::{Result, SimdexError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Norms at or below this threshold are treated as zero.
pub const NORM_EPSILON: f32 = 1e-12;

/// Distance policy, fixed at index construction.
///
/// The metric decides both the score between two vectors and the sort
/// direction of results: ascending for [`Metric::SquaredL2`], descending
/// for [`Metric::InnerProduct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Metric {
    /// `Σ (a_i - b_i)^2`. Lower is more similar. No normalization applied.
    #[default]
    SquaredL2,
    /// Dot product after L2-normalizing both sides (cosine similarity).
    /// Higher is more similar.
    ///
    /// Zero-vector policy: a vector with norm ≤ [`NORM_EPSILON`] normalizes
    /// to the zero vector, so its similarity to everything is 0.0. Callers
    /// that want to reject degenerate embeddings outright should run them
    /// through [`l2_norm`] first.
    InnerProduct,
}

impl Metric {
    /// Scores `query` against `stored`. Both slices must share a dimension;
    /// the index layer validates that before calling in.
    pub fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        match self {
            Metric::SquaredL2 => squared_l2(query, stored),
            Metric::InnerProduct => {
                dot_product(&normalized_or_zero(query), &normalized_or_zero(stored))
            }
        }
    }

    /// Ranking order for two scores: `Less` means `a` ranks ahead of `b`.
    pub fn ordering(&self, a: f32, b: f32) -> Ordering {
        match self {
            Metric::SquaredL2 => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            Metric::InnerProduct => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        }
    }

    /// Whether score `a` is strictly more similar than score `b`.
    pub fn better(&self, a: f32, b: f32) -> bool {
        self.ordering(a, b) == Ordering::Less
    }
}

/// L2 Normalization
/// norm_vec = vec / ||vec||
/// A zero (or empty) vector cannot be normalized.
pub fn l2_norm(vector: &[f32]) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm <= NORM_EPSILON {
        return Err(SimdexError::ZeroNorm);
    }

    Ok(vector.iter().map(|x| x / norm).collect())
}

/// Normalizes `vector`, mapping a zero vector to the zero vector instead of
/// failing. This is the policy used inside metric evaluation.
pub fn normalized_or_zero(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm <= NORM_EPSILON {
        return vec![0.0; vector.len()];
    }

    vector.iter().map(|x| x / norm).collect()
}

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) for i = 0..a.len()
pub fn dot_product(left: &[f32], right: &[f32]) -> f32 {
    debug_assert_eq!(left.len(), right.len(), "vectors must share a dimension");

    left.iter().zip(right.iter()).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean distance between two vectors of the same dimension.
pub fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    debug_assert_eq!(left.len(), right.len(), "vectors must share a dimension");

    left.iter()
        .zip(right.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Ranks scored positions under `metric` and keeps the best `k`.
///
/// `scored` must be built in ascending insertion-position order: the sort is
/// stable, so equal scores keep first-inserted-first order.
pub(crate) fn rank_top_k(
    metric: Metric,
    mut scored: Vec<(usize, f32)>,
    k: usize,
) -> Vec<(usize, f32)> {
    scored.sort_by(|a, b| metric.ordering(a.1, b.1));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod vector_test {
    use super::*;

    // ========== L2 Normalization Tests ==========

    #[test]
    fn test_l2_norm_basic() {
        // [3.0, 4.0] should normalize to [0.6, 0.8] since ||[3,4]|| = 5
        let result = l2_norm(&[3.0, 4.0]).unwrap();

        assert_eq!(result.len(), 2);
        assert!((result[0] - 0.6).abs() < 1e-6);
        assert!((result[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_is_unit_length() {
        let result = l2_norm(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        let norm: f32 = result.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_negative_values() {
        let result = l2_norm(&[-3.0, 4.0]).unwrap();

        assert!((result[0] - (-0.6)).abs() < 1e-6);
        assert!((result[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_zero_vector_error() {
        let result = l2_norm(&[0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(SimdexError::ZeroNorm)));
    }

    #[test]
    fn test_l2_norm_empty_vector_error() {
        let result = l2_norm(&[]);
        assert!(matches!(result, Err(SimdexError::ZeroNorm)));
    }

    #[test]
    fn test_normalized_or_zero_maps_zero_to_zero() {
        let result = normalized_or_zero(&[0.0, 0.0]);
        assert_eq!(result, vec![0.0, 0.0]);
    }

    // ========== Dot Product / Squared L2 Tests ==========

    #[test]
    fn test_dot_product_basic() {
        // 1*4 + 2*5 + 3*6 = 32
        let result = dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert!((result - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_product_orthogonal() {
        let result = dot_product(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(result.abs() < 1e-6);
    }

    #[test]
    fn test_squared_l2_identical_is_zero() {
        let result = squared_l2(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(result.abs() < 1e-6);
    }

    #[test]
    fn test_squared_l2_basic() {
        // (1-0)^2 + (0-1)^2 = 2
        let result = squared_l2(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((result - 2.0).abs() < 1e-6);
    }

    // ========== Metric Tests ==========

    #[test]
    fn test_metric_score_inner_product_normalizes() {
        // [2, 0] and [5, 0] both normalize to [1, 0]; similarity is 1.0
        let score = Metric::InnerProduct.score(&[2.0, 0.0], &[5.0, 0.0]);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_metric_score_inner_product_zero_vector() {
        let score = Metric::InnerProduct.score(&[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_metric_ordering_directions() {
        // L2: smaller distance ranks first
        assert!(Metric::SquaredL2.better(0.1, 0.5));
        // Inner product: larger similarity ranks first
        assert!(Metric::InnerProduct.better(0.9, 0.2));
    }

    #[test]
    fn test_rank_top_k_stable_ties() {
        // Equal scores keep insertion order
        let scored = vec![(0, 1.0), (1, 0.5), (2, 0.5), (3, 2.0)];
        let ranked = rank_top_k(Metric::SquaredL2, scored, 3);
        assert_eq!(ranked, vec![(1, 0.5), (2, 0.5), (0, 1.0)]);
    }

    #[test]
    fn test_normalize_then_dot_product() {
        let n1 = l2_norm(&[1.0, 0.0, 0.0]).unwrap();
        let n2 = l2_norm(&[0.7, 0.7, 0.0]).unwrap();

        let similarity = dot_product(&n1, &n2);
        assert!((similarity - 0.707).abs() < 0.001);
    }
}
