//! Chunked parquet source readers.
//!
//! Each reader scans its dataset with DuckDB's `read_parquet`, casting every
//! column to VARCHAR so that downstream transformers own all numeric and
//! temporal coercion. Chunking exists solely to bound peak memory: a chunk is
//! handed to the callback by value and dropped when the callback returns,
//! before the next chunk is materialized.

use std::path::{Path, PathBuf};

use duckdb::Connection;
use tracing::debug;

use crate::IngestError;

/// Default rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// One raw row of the links dataset, uncoerced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLinkRow {
    pub link_id: Option<String>,
    pub geo_json: Option<String>,
    pub road_name: Option<String>,
    pub length: Option<String>,
}

/// One raw row of the speed dataset, uncoerced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSpeedRow {
    pub link_id: Option<String>,
    pub date_time: Option<String>,
    pub average_speed: Option<String>,
    pub period: Option<String>,
}

/// Escape a path for inlining into a `read_parquet` call.
fn sql_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "''")
}

/// Open a scan connection for `path`, failing fatally if the file is absent.
fn open_scan(path: &Path) -> Result<(Connection, PathBuf), IngestError> {
    if !path.is_file() {
        return Err(IngestError::SourceNotFound(path.to_path_buf()));
    }
    let conn = Connection::open_in_memory().map_err(IngestError::Source)?;
    Ok((conn, path.to_path_buf()))
}

/// Reader for the links dataset
/// (`link_id`, `geo_json`, `road_name`, `_length`).
#[derive(Debug)]
pub struct LinkSource {
    conn: Connection,
    path: PathBuf,
}

impl LinkSource {
    /// Open the dataset at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::SourceNotFound`] if the file does not exist,
    /// [`IngestError::Source`] if the scan connection cannot be opened.
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let (conn, path) = open_scan(path)?;
        Ok(Self { conn, path })
    }

    /// Full row count of the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] if the scan fails.
    pub fn row_count(&self) -> Result<u64, IngestError> {
        row_count(&self.conn, &self.path)
    }

    /// Stream the dataset as contiguous chunks of at most `chunk_size` rows,
    /// in source order. Consumes the reader: the sequence is lazy, finite,
    /// and non-restartable.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] on scan failure, or whatever the
    /// callback returns.
    pub fn for_each_chunk<F>(self, chunk_size: usize, mut f: F) -> Result<(), IngestError>
    where
        F: FnMut(Vec<RawLinkRow>) -> Result<(), IngestError>,
    {
        let sql = format!(
            "SELECT CAST(link_id AS VARCHAR),
                    CAST(geo_json AS VARCHAR),
                    CAST(road_name AS VARCHAR),
                    CAST(_length AS VARCHAR)
             FROM read_parquet('{}')",
            sql_path(&self.path)
        );
        let mut stmt = self.conn.prepare(&sql).map_err(IngestError::Source)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawLinkRow {
                    link_id: row.get(0)?,
                    geo_json: row.get(1)?,
                    road_name: row.get(2)?,
                    length: row.get(3)?,
                })
            })
            .map_err(IngestError::Source)?;

        let chunk_size = chunk_size.max(1);
        let mut buffer = Vec::with_capacity(chunk_size);
        for row in rows {
            buffer.push(row.map_err(IngestError::Source)?);
            if buffer.len() == chunk_size {
                debug!(rows = buffer.len(), "link chunk ready");
                f(std::mem::take(&mut buffer))?;
            }
        }
        if !buffer.is_empty() {
            f(buffer)?;
        }
        Ok(())
    }
}

/// Reader for the speed dataset
/// (`link_id`, `date_time`, `average_speed`, `period`).
pub struct SpeedSource {
    conn: Connection,
    path: PathBuf,
}

impl SpeedSource {
    /// Open the dataset at `path`.
    ///
    /// # Errors
    ///
    /// Same contract as [`LinkSource::open`].
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let (conn, path) = open_scan(path)?;
        Ok(Self { conn, path })
    }

    /// Full row count of the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] if the scan fails.
    pub fn row_count(&self) -> Result<u64, IngestError> {
        row_count(&self.conn, &self.path)
    }

    /// Mean `average_speed` per period code, computed directly from the
    /// source file. Used by verification to cross-check persisted aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] if the scan fails.
    pub fn mean_speed_by_period(&self) -> Result<Vec<(i64, f64)>, IngestError> {
        let sql = format!(
            "SELECT CAST(period AS BIGINT), AVG(CAST(average_speed AS DOUBLE))
             FROM read_parquet('{}')
             WHERE period IS NOT NULL
             GROUP BY 1
             ORDER BY 1",
            sql_path(&self.path)
        );
        let mut stmt = self.conn.prepare(&sql).map_err(IngestError::Source)?;
        let means = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(IngestError::Source)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(IngestError::Source)?;
        Ok(means)
    }

    /// Stream the dataset as contiguous chunks, as
    /// [`LinkSource::for_each_chunk`] does.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] on scan failure, or whatever the
    /// callback returns.
    pub fn for_each_chunk<F>(self, chunk_size: usize, mut f: F) -> Result<(), IngestError>
    where
        F: FnMut(Vec<RawSpeedRow>) -> Result<(), IngestError>,
    {
        let sql = format!(
            "SELECT CAST(link_id AS VARCHAR),
                    CAST(date_time AS VARCHAR),
                    CAST(average_speed AS VARCHAR),
                    CAST(period AS VARCHAR)
             FROM read_parquet('{}')",
            sql_path(&self.path)
        );
        let mut stmt = self.conn.prepare(&sql).map_err(IngestError::Source)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawSpeedRow {
                    link_id: row.get(0)?,
                    date_time: row.get(1)?,
                    average_speed: row.get(2)?,
                    period: row.get(3)?,
                })
            })
            .map_err(IngestError::Source)?;

        let chunk_size = chunk_size.max(1);
        let mut buffer = Vec::with_capacity(chunk_size);
        for row in rows {
            buffer.push(row.map_err(IngestError::Source)?);
            if buffer.len() == chunk_size {
                debug!(rows = buffer.len(), "speed chunk ready");
                f(std::mem::take(&mut buffer))?;
            }
        }
        if !buffer.is_empty() {
            f(buffer)?;
        }
        Ok(())
    }
}

fn row_count(conn: &Connection, path: &Path) -> Result<u64, IngestError> {
    let sql = format!(
        "SELECT count(*) FROM read_parquet('{}')",
        sql_path(path)
    );
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(IngestError::Source)?;
    Ok(u64::try_from(count).unwrap_or(0))
}
