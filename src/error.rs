//! Error types shared across the crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimdexError>;

/// Everything that can go wrong inside the index layer.
///
/// All variants are synchronous validation or I/O failures surfaced
/// directly to the caller; nothing here is retried internally.
#[derive(Error, Debug)]
pub enum SimdexError {
    /// An embedding or query vector does not match the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A clustered index was searched or populated before training.
    #[error("clustered index is not trained; call train() first")]
    IndexNotTrained,

    /// Training was requested with fewer samples than clusters.
    #[error("cannot train {clusters} clusters from {samples} samples")]
    InsufficientSamples { samples: usize, clusters: usize },

    /// A positional lookup past the end of the store.
    #[error("position {position} out of range (store holds {len} vectors)")]
    IndexOutOfRange { position: usize, len: usize },

    /// L2 normalization of a zero (or empty) vector was requested.
    #[error("cannot normalize a zero vector")]
    ZeroNorm,

    /// Load was asked for a path that does not exist.
    #[error("index file not found: {0}")]
    FileNotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Bincode failure while saving or loading an index.
    #[error("index codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// JSON failure while writing a similarity report.
    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod error_test {
    use super::*;

    #[test]
    fn test_display_texts_name_the_condition() {
        let err = SimdexError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");

        assert!(SimdexError::IndexNotTrained.to_string().contains("not trained"));

        let err = SimdexError::InsufficientSamples {
            samples: 2,
            clusters: 5,
        };
        assert!(err.to_string().contains("5 clusters from 2 samples"));

        let err = SimdexError::IndexOutOfRange { position: 9, len: 3 };
        assert!(err.to_string().contains("position 9"));
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<std::fs::File> {
            Ok(std::fs::File::open("/definitely/not/here")?)
        }

        assert!(matches!(open_missing(), Err(SimdexError::Io(_))));
    }
}
