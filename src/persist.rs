//! Index persistence.
//!
//! A complete index (store, metric, and for the clustered variant the
//! centroids and assignments) round-trips through a single bincode file,
//! so a prebuilt index can be reloaded without retraining.

use crate::error::{Result, SimdexError};
use crate::query::Index;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

impl Index {
    /// Saves the full index state to `path` with bincode.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)?;

        log::debug!("saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    /// Loads an index previously written by [`save`](Index::save).
    ///
    /// The loaded index answers searches identically to the one that was
    /// saved, trained state included.
    pub fn load(path: impl AsRef<Path>) -> Result<Index> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SimdexError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let index: Index = bincode::deserialize_from(reader)?;
        Ok(index)
    }
}
