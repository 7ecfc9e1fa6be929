//! Ingestion pipeline tuning knobs.

use serde::{Deserialize, Serialize};

/// Rows per source chunk (the memory-bounding unit).
const fn default_chunk_size() -> usize {
    5000
}

/// Rows per link insert transaction.
const fn default_link_batch_size() -> usize {
    1000
}

/// Rows per speed-record insert transaction.
const fn default_speed_batch_size() -> usize {
    5000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Contiguous source rows read per chunk. Bounds peak memory, not
    /// correctness: inserted counts are identical for any chunk size.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Batch size for link bulk inserts (one transaction per batch).
    #[serde(default = "default_link_batch_size")]
    pub link_batch_size: usize,

    /// Batch size for speed-record bulk inserts.
    #[serde(default = "default_speed_batch_size")]
    pub speed_batch_size: usize,

    /// Default links dataset path, overridable by `velo ingest --links`.
    #[serde(default)]
    pub links_path: String,

    /// Default speed dataset path, overridable by `velo ingest --speeds`.
    #[serde(default)]
    pub speeds_path: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            link_batch_size: default_link_batch_size(),
            speed_batch_size: default_speed_batch_size(),
            links_path: String::new(),
            speeds_path: String::new(),
        }
    }
}
