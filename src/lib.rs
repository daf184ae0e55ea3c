//! # simdex - Embedding Similarity Index
//!
//! simdex is a single-process similarity search engine for image
//! embeddings: fixed-dimension float vectors paired with opaque
//! identifiers (filenames, product IDs). Embeddings come from an external
//! feature extractor; this crate only stores and searches them.
//!
//! Two index variants share one store and metric contract:
//!
//! - [`FlatIndex`]: exact brute-force top-k search.
//! - [`ClusteredIndex`]: approximate inverted-file search behind a trained
//!   k-means coarse quantizer, probing a configurable number of clusters.
//!
//! ## Example
//!
//! ```
//! use simdex::{FlatIndex, Metric, VectorStore};
//!
//! let mut store = VectorStore::new();
//! store.append("shirt.jpg", vec![1.0, 0.0]).unwrap();
//! store.append("shoe.jpg", vec![0.0, 1.0]).unwrap();
//! store.append("tshirt.jpg", vec![0.9, 0.1]).unwrap();
//!
//! let index = FlatIndex::build(store, Metric::SquaredL2);
//! let results = index.search(&[1.0, 0.0], 2).unwrap();
//! assert_eq!(results[0].identifier, "shirt.jpg"); // exact match first
//! ```

pub mod clustered;
pub mod error;
pub mod flat;
pub mod persist;
pub mod query;
pub mod server;
pub mod store;
pub mod vector;

pub use clustered::{ClusteredIndex, DEFAULT_NUM_PROBE};
pub use error::{Result, SimdexError};
pub use flat::{FlatIndex, Neighbor};
pub use query::{
    write_similarity_report, Index, IndexKind, QueryService, SearchOptions, DEFAULT_TOP_K,
};
pub use store::VectorStore;
pub use vector::Metric;
