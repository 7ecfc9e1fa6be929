//! Bulk insert with per-batch transactions and degraded per-row retry.
//!
//! A chunk of entities is written in sub-batches, each inside one
//! transaction. A batch moves through three states: `Batched` (one bulk
//! insert, the common path), `Degraded` (entered only when the bulk insert
//! failed; every row retried in its own transaction), `Done`. A row that
//! still fails individually is counted, never fatal — one malformed row must
//! not discard an otherwise-valid batch.
//!
//! Failing to even open a transaction means the session itself is broken;
//! that propagates as [`StoreError`] and aborts the run.

use duckdb::{Connection, Statement, params};
use tracing::{debug, warn};

use velo_core::{Link, SpeedRecord};

use crate::{Store, StoreError};

const INSERT_LINK: &str = "
INSERT INTO links (link_id, geometry, road_name, length, road_type, speed_limit)
VALUES (?, ?, ?, ?, ?, ?)";

const INSERT_SPEED: &str = "
INSERT INTO speed_records (link_id, timestamp, speed, day_of_week, time_period)
VALUES (?, CAST(? AS TIMESTAMP), ?, ?, ?)";

/// Rows committed and rows lost for one writer call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Rows actually committed.
    pub inserted: u64,
    /// Rows that failed their individual retry after a batch rollback.
    pub failed: u64,
}

impl BatchStats {
    fn absorb(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.failed += other.failed;
    }
}

/// An entity that knows its INSERT statement and parameter binding.
trait BindRow {
    const SQL: &'static str;

    fn insert(&self, stmt: &mut Statement<'_>) -> duckdb::Result<()>;
}

impl BindRow for Link {
    const SQL: &'static str = INSERT_LINK;

    fn insert(&self, stmt: &mut Statement<'_>) -> duckdb::Result<()> {
        stmt.execute(params![
            self.link_id,
            self.geometry,
            self.road_name,
            self.length,
            self.road_type,
            self.speed_limit
        ])?;
        Ok(())
    }
}

impl BindRow for SpeedRecord {
    const SQL: &'static str = INSERT_SPEED;

    fn insert(&self, stmt: &mut Statement<'_>) -> duckdb::Result<()> {
        let timestamp = self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        stmt.execute(params![
            self.link_id,
            timestamp,
            self.speed,
            self.day_of_week,
            self.time_period
        ])?;
        Ok(())
    }
}

enum BatchState {
    Batched,
    Degraded,
    Done,
}

impl Store {
    /// Write link entities in batches of `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] only when a transaction cannot be
    /// opened at all; insert failures degrade to per-row retries and are
    /// reported in the returned [`BatchStats`].
    pub fn insert_links(
        &mut self,
        links: &[Link],
        batch_size: usize,
    ) -> Result<BatchStats, StoreError> {
        write_batched(self.conn_mut(), links, batch_size)
    }

    /// Write speed-record entities in batches of `batch_size`.
    ///
    /// # Errors
    ///
    /// Same contract as [`Store::insert_links`].
    pub fn insert_speed_records(
        &mut self,
        records: &[SpeedRecord],
        batch_size: usize,
    ) -> Result<BatchStats, StoreError> {
        write_batched(self.conn_mut(), records, batch_size)
    }

    fn conn_mut(&mut self) -> &mut Connection {
        // Writers need &mut for duckdb's transaction API.
        &mut self.conn
    }
}

fn write_batched<T: BindRow>(
    conn: &mut Connection,
    rows: &[T],
    batch_size: usize,
) -> Result<BatchStats, StoreError> {
    let batch_size = batch_size.max(1);
    let mut stats = BatchStats::default();
    for batch in rows.chunks(batch_size) {
        stats.absorb(write_batch(conn, batch)?);
    }
    debug!(
        inserted = stats.inserted,
        failed = stats.failed,
        "writer finished"
    );
    Ok(stats)
}

fn write_batch<T: BindRow>(conn: &mut Connection, batch: &[T]) -> Result<BatchStats, StoreError> {
    let mut stats = BatchStats::default();
    let mut state = BatchState::Batched;
    loop {
        state = match state {
            BatchState::Batched => match bulk_insert(conn, batch)? {
                None => {
                    stats.inserted += batch.len() as u64;
                    BatchState::Done
                }
                Some(error) => {
                    warn!(
                        rows = batch.len(),
                        %error,
                        "batch insert failed, retrying row-by-row"
                    );
                    BatchState::Degraded
                }
            },
            BatchState::Degraded => {
                for row in batch {
                    match insert_one(conn, row)? {
                        None => stats.inserted += 1,
                        Some(error) => {
                            warn!(%error, "row insert failed, skipping");
                            stats.failed += 1;
                        }
                    }
                }
                BatchState::Done
            }
            BatchState::Done => break,
        };
    }
    Ok(stats)
}

/// Attempt the whole batch in one transaction.
///
/// `Ok(None)` means committed; `Ok(Some(e))` means the transaction rolled
/// back and the caller should degrade.
fn bulk_insert<T: BindRow>(
    conn: &mut Connection,
    batch: &[T],
) -> Result<Option<duckdb::Error>, StoreError> {
    let tx = conn.transaction()?;
    let attempt = (|| -> duckdb::Result<()> {
        let mut stmt = tx.prepare(T::SQL)?;
        for row in batch {
            row.insert(&mut stmt)?;
        }
        Ok(())
    })();
    match attempt {
        Ok(()) => match tx.commit() {
            Ok(()) => Ok(None),
            Err(e) => Ok(Some(e)),
        },
        // Dropping the transaction rolls the batch back.
        Err(e) => Ok(Some(e)),
    }
}

/// Insert a single row in its own transaction.
fn insert_one<T: BindRow>(
    conn: &mut Connection,
    row: &T,
) -> Result<Option<duckdb::Error>, StoreError> {
    let tx = conn.transaction()?;
    let attempt = (|| -> duckdb::Result<()> {
        let mut stmt = tx.prepare(T::SQL)?;
        row.insert(&mut stmt)
    })();
    match attempt {
        Ok(()) => match tx.commit() {
            Ok(()) => Ok(None),
            Err(e) => Ok(Some(e)),
        },
        Err(e) => Ok(Some(e)),
    }
}
