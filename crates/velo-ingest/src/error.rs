//! Ingestion error types.
//!
//! Only fatal conditions surface here. Per-row problems are
//! `velo_core::SkipReason` values, not errors.

use std::path::PathBuf;

use velo_store::StoreError;

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A source dataset file does not exist. Never retried.
    #[error("source dataset not found: {0}")]
    SourceNotFound(PathBuf),

    /// Reading or scanning a source dataset failed.
    #[error("source read error: {0}")]
    Source(duckdb::Error),

    /// The destination store failed (includes the destructive-clear step).
    #[error(transparent)]
    Store(#[from] StoreError),
}
