//! Store error types.

/// Errors that can occur in the relational storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `DuckDB` operation failed.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// The destructive pre-run clear failed. The destination may hold a mix
    /// of old and new rows, so the run must abort rather than insert on top.
    #[error("destructive clear failed: {0}")]
    Clear(#[source] duckdb::Error),
}
