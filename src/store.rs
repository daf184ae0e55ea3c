//! The vector store module.
//!
//! Holds every known embedding together with its opaque identifier
//! (a filename or product ID). The store is append-only: positions are
//! assigned in insertion order and never reordered, because search results
//! are decoded back to identifiers positionally.

use crate::error::{Result, SimdexError};
use serde::{Deserialize, Serialize};

/// Append-only collection of `(embedding, identifier)` pairs.
///
/// Embeddings are stored contiguously as
/// `[v1_d1, v1_d2, ..., v2_d1, v2_d2, ...]` and sliced out by position.
/// The dimension is fixed either at construction or by the first append
/// and is invariant for the lifetime of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStore {
    ids: Vec<String>,
    vectors: Vec<f32>,
    dimension: Option<usize>,
}

impl VectorStore {
    /// Creates an empty store whose dimension is inferred from the first
    /// appended embedding.
    pub fn new() -> VectorStore {
        VectorStore {
            ids: Vec::new(),
            vectors: Vec::new(),
            dimension: None,
        }
    }

    /// Creates an empty store with the dimension fixed up front.
    pub fn with_dimension(dimension: usize) -> VectorStore {
        VectorStore {
            ids: Vec::new(),
            vectors: Vec::new(),
            dimension: Some(dimension),
        }
    }

    /// Appends an embedding with its identifier.
    ///
    /// Fails with [`SimdexError::DimensionMismatch`] if the embedding does
    /// not match the store dimension; the store is left untouched in that
    /// case. Duplicate identifiers are permitted (the mapping is purely
    /// positional); uniqueness is the caller's concern.
    pub fn append(&mut self, identifier: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        let dim = embedding.len();
        match self.dimension {
            None => self.dimension = Some(dim),
            Some(d) => {
                if dim != d {
                    return Err(SimdexError::DimensionMismatch {
                        expected: d,
                        actual: dim,
                    });
                }
            }
        }

        self.ids.push(identifier.into());
        self.vectors.extend(embedding);
        Ok(())
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The fixed dimension, or `None` while the store is empty and was
    /// created without one.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Returns the `(embedding, identifier)` pair at `position`, or
    /// [`SimdexError::IndexOutOfRange`] past the end of the store.
    pub fn get(&self, position: usize) -> Result<(&[f32], &str)> {
        if position >= self.len() {
            return Err(SimdexError::IndexOutOfRange {
                position,
                len: self.len(),
            });
        }

        Ok((self.embedding(position), &self.ids[position]))
    }

    /// Identifier at `position`. Panics on out-of-range positions; callers
    /// only use positions produced by iterating the store itself.
    pub(crate) fn identifier(&self, position: usize) -> &str {
        &self.ids[position]
    }

    /// Slices the embedding at `position` out of the flat array.
    pub(crate) fn embedding(&self, position: usize) -> &[f32] {
        let dim = self.dimension.expect("non-empty store always has a dimension");
        &self.vectors[position * dim..(position + 1) * dim]
    }

    /// Checks a query vector against the store dimension.
    pub(crate) fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        match self.dimension {
            Some(d) if vector.len() != d => Err(SimdexError::DimensionMismatch {
                expected: d,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }
}
