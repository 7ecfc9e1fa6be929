//! End-to-end pipeline orchestration.
//!
//! One run: open sources → destructive clear → link phase → referential
//! index → speed phase. The caller owns the [`Store`] session; no global
//! state survives the run except the rows it committed.

use std::path::PathBuf;

use tracing::info;

use velo_core::{PhaseReport, RowResult, SkipReason};
use velo_store::Store;

use crate::source::{DEFAULT_CHUNK_SIZE, LinkSource, SpeedSource};
use crate::transform::{transform_link, transform_speed};
use crate::IngestError;

/// Default rows per link insert transaction.
pub const DEFAULT_LINK_BATCH_SIZE: usize = 1000;
/// Default rows per speed-record insert transaction.
pub const DEFAULT_SPEED_BATCH_SIZE: usize = 5000;

/// Explicit configuration for one pipeline run.
///
/// Passed in by the caller — there are no cached engines or lazily
/// initialized singletons behind this.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Links dataset (parquet).
    pub links_path: PathBuf,
    /// Speed dataset (parquet).
    pub speeds_path: PathBuf,
    /// Contiguous source rows per chunk; bounds peak memory only.
    pub chunk_size: usize,
    /// Rows per link insert transaction.
    pub link_batch_size: usize,
    /// Rows per speed-record insert transaction.
    pub speed_batch_size: usize,
}

impl PipelineConfig {
    /// Configuration with default chunk and batch sizes.
    #[must_use]
    pub fn new(links_path: impl Into<PathBuf>, speeds_path: impl Into<PathBuf>) -> Self {
        Self {
            links_path: links_path.into(),
            speeds_path: speeds_path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            link_batch_size: DEFAULT_LINK_BATCH_SIZE,
            speed_batch_size: DEFAULT_SPEED_BATCH_SIZE,
        }
    }
}

/// Accounting for a whole run, one report per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub links: PhaseReport,
    pub speeds: PhaseReport,
}

/// Run the full ingestion pipeline against `store`.
///
/// Destructive: all existing links and speed records are deleted first.
/// Sources are opened before the clear so that a missing file aborts the
/// run while the destination is still intact.
///
/// # Errors
///
/// Returns [`IngestError`] on the fatal conditions only: missing/unreadable
/// source, failed clear, broken store session. Row-level problems are
/// reported in the [`RunReport`], never as errors.
pub fn run(store: &mut Store, config: &PipelineConfig) -> Result<RunReport, IngestError> {
    let link_source = LinkSource::open(&config.links_path)?;
    let speed_source = SpeedSource::open(&config.speeds_path)?;

    store.clear()?;

    let links = run_link_phase(store, link_source, config)?;
    let link_index = store.load_link_index()?;
    let speeds = run_speed_phase(store, speed_source, &link_index, config)?;

    Ok(RunReport { links, speeds })
}

fn run_link_phase(
    store: &mut Store,
    source: LinkSource,
    config: &PipelineConfig,
) -> Result<PhaseReport, IngestError> {
    let mut report = PhaseReport {
        rows_read: source.row_count()?,
        ..PhaseReport::default()
    };

    source.for_each_chunk(config.chunk_size, |chunk| {
        let mut entities = Vec::with_capacity(chunk.len());
        for raw in &chunk {
            match transform_link(raw) {
                RowResult::Row(link) => entities.push(link),
                RowResult::Skip(reason) => report.record_skip(reason),
            }
        }
        let stats = store.insert_links(&entities, config.link_batch_size)?;
        report.rows_inserted += stats.inserted;
        report.record_skips(SkipReason::InsertFailed, stats.failed);
        // `chunk` and `entities` drop here, before the next chunk is read.
        Ok(())
    })?;

    info!(phase = "links", %report, "phase complete");
    Ok(report)
}

fn run_speed_phase(
    store: &mut Store,
    source: SpeedSource,
    link_index: &std::collections::HashSet<i64>,
    config: &PipelineConfig,
) -> Result<PhaseReport, IngestError> {
    let mut report = PhaseReport {
        rows_read: source.row_count()?,
        ..PhaseReport::default()
    };

    source.for_each_chunk(config.chunk_size, |chunk| {
        let mut entities = Vec::with_capacity(chunk.len());
        for raw in &chunk {
            match transform_speed(raw, link_index) {
                RowResult::Row(record) => entities.push(record),
                RowResult::Skip(reason) => report.record_skip(reason),
            }
        }
        let stats = store.insert_speed_records(&entities, config.speed_batch_size)?;
        report.rows_inserted += stats.inserted;
        report.record_skips(SkipReason::InsertFailed, stats.failed);
        Ok(())
    })?;

    info!(phase = "speeds", %report, "phase complete");
    Ok(report)
}
