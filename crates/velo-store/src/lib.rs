//! # velo-store
//!
//! DuckDB relational store backing the velo ingestion pipeline.
//!
//! One [`Store`] wraps one `duckdb::Connection` used serially for a whole
//! ingestion run. Batch commit/rollback inside the writers is the sole
//! transaction boundary; nothing here is shared across threads.

pub mod error;
pub mod schema;
pub mod writer;

pub use error::StoreError;
pub use writer::BatchStats;

use std::collections::HashSet;

use duckdb::Connection;
use tracing::info;

/// A sampled row from `links`, used by verification.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSample {
    pub link_id: i64,
    pub road_name: Option<String>,
    pub geometry: Option<String>,
}

/// A sampled row from `speed_records`, used by verification.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedSample {
    pub link_id: i64,
    pub timestamp: String,
    pub speed: f64,
    pub time_period: Option<String>,
}

/// The destination store for links and speed records.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store at the given path.
    ///
    /// Creates tables and indexes if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the file cannot be opened or schema
    /// creation fails.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if schema creation fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Access the underlying `DuckDB` connection.
    ///
    /// Exposed for verification queries; prefer the typed methods for
    /// standard operations.
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(schema::CREATE_SEQUENCES)?;
        self.conn.execute_batch(schema::CREATE_LINKS)?;
        self.conn.execute_batch(schema::CREATE_SPEED_RECORDS)?;
        self.conn.execute_batch(schema::CREATE_INDEXES)?;
        Ok(())
    }

    /// Delete all speed records, then all links, in one transaction.
    ///
    /// Every ingestion run starts here: the pipeline is full-reload, not
    /// upsert. Order matters because of the foreign key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Clear`]; the caller must treat this as fatal.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(StoreError::Clear)?;
        let speeds = tx
            .execute("DELETE FROM speed_records", [])
            .map_err(StoreError::Clear)?;
        let links = tx
            .execute("DELETE FROM links", [])
            .map_err(StoreError::Clear)?;
        tx.commit().map_err(StoreError::Clear)?;
        info!(speeds, links, "cleared existing rows");
        Ok(())
    }

    /// Load every persisted `link_id` into an in-memory set.
    ///
    /// Issued exactly once per run, after the link phase commits. The set
    /// replaces a per-row existence query during the speed phase and is
    /// treated as immutable for the remainder of the run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn load_link_index(&self) -> Result<HashSet<i64>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT link_id FROM links")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<i64>, _>>()?;
        info!(links = ids.len(), "built referential index");
        Ok(ids)
    }

    /// Count persisted links.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn count_links(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT count(*) FROM links", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count persisted speed records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn count_speed_records(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT count(*) FROM speed_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Fetch one link with a non-null geometry, if any exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn sample_link(&self) -> Result<Option<LinkSample>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT link_id, road_name, geometry FROM links
             WHERE geometry IS NOT NULL LIMIT 1",
        )?;
        match stmt.query_row([], |row| {
            Ok(LinkSample {
                link_id: row.get(0)?,
                road_name: row.get(1)?,
                geometry: row.get(2)?,
            })
        }) {
            Ok(sample) => Ok(Some(sample)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch one speed record, if any exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn sample_speed_record(&self) -> Result<Option<SpeedSample>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT link_id, CAST(timestamp AS VARCHAR), speed, time_period
             FROM speed_records LIMIT 1",
        )?;
        match stmt.query_row([], |row| {
            Ok(SpeedSample {
                link_id: row.get(0)?,
                timestamp: row.get(1)?,
                speed: row.get(2)?,
                time_period: row.get(3)?,
            })
        }) {
            Ok(sample) => Ok(Some(sample)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Count speed records whose `link_id` has no matching link.
    ///
    /// Zero whenever the pipeline wrote the data; the referential index
    /// filters unknown links before any batch is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn orphan_speed_count(&self) -> Result<i64, StoreError> {
        let count = self.conn.query_row(
            "SELECT count(*)
             FROM speed_records s
             LEFT JOIN links l ON s.link_id = l.link_id
             WHERE l.link_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count links whose stored geometry is not a single-part SRID-4326
    /// LINESTRING.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn malformed_geometry_count(&self) -> Result<i64, StoreError> {
        let count = self.conn.query_row(
            "SELECT count(*) FROM links
             WHERE geometry IS NOT NULL
               AND geometry NOT LIKE 'SRID=4326;LINESTRING%'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mean persisted speed per named time period.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuckDb`] if the query fails.
    pub fn mean_speed_by_period(&self) -> Result<Vec<(String, f64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT time_period, AVG(speed)
             FROM speed_records
             WHERE time_period IS NOT NULL
             GROUP BY time_period
             ORDER BY time_period",
        )?;
        let means = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(means)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use velo_core::{Link, SpeedRecord};

    use super::*;

    fn link(id: i64) -> Link {
        Link {
            link_id: id,
            geometry: Some(format!("SRID=4326;LINESTRING({id} 0, {id} 1)")),
            road_name: Some(format!("Road {id}")),
            length: Some(120.5),
            road_type: None,
            speed_limit: None,
        }
    }

    fn speed(link_id: i64) -> SpeedRecord {
        SpeedRecord {
            link_id,
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            speed: 34.5,
            day_of_week: Some("Monday".to_string()),
            time_period: Some("AM Peak".to_string()),
        }
    }

    #[test]
    fn schema_creation() {
        let store = Store::open_in_memory().expect("open in-memory store");

        let tables: Vec<String> = {
            let mut stmt = store
                .conn()
                .prepare(
                    "SELECT table_name FROM information_schema.tables
                     WHERE table_schema = 'main'
                     ORDER BY table_name",
                )
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        };

        assert!(tables.contains(&"links".to_string()));
        assert!(tables.contains(&"speed_records".to_string()));
    }

    #[test]
    fn clear_empties_both_tables() {
        let mut store = Store::open_in_memory().expect("open store");
        store.insert_links(&[link(1), link(2)], 100).unwrap();
        store.insert_speed_records(&[speed(1)], 100).unwrap();

        store.clear().expect("clear");

        assert_eq!(store.count_links().unwrap(), 0);
        assert_eq!(store.count_speed_records().unwrap(), 0);
    }

    #[test]
    fn link_index_holds_all_ids() {
        let mut store = Store::open_in_memory().expect("open store");
        store
            .insert_links(&[link(10), link(20), link(30)], 2)
            .unwrap();

        let index = store.load_link_index().expect("load index");
        assert_eq!(index.len(), 3);
        assert!(index.contains(&10));
        assert!(index.contains(&30));
        assert!(!index.contains(&40));
    }

    #[test]
    fn samples_return_none_on_empty_store() {
        let store = Store::open_in_memory().expect("open store");
        assert_eq!(store.sample_link().unwrap(), None);
        assert_eq!(store.sample_speed_record().unwrap(), None);
    }

    #[test]
    fn sample_and_aggregate_queries() {
        let mut store = Store::open_in_memory().expect("open store");
        store.insert_links(&[link(1)], 100).unwrap();
        store.insert_speed_records(&[speed(1)], 100).unwrap();

        let link_sample = store.sample_link().unwrap().expect("one link");
        assert_eq!(link_sample.link_id, 1);
        assert!(link_sample.geometry.unwrap().starts_with("SRID=4326;"));

        let speed_sample = store.sample_speed_record().unwrap().expect("one speed");
        assert_eq!(speed_sample.link_id, 1);
        assert!((speed_sample.speed - 34.5).abs() < f64::EPSILON);
        assert_eq!(speed_sample.time_period.as_deref(), Some("AM Peak"));

        let means = store.mean_speed_by_period().unwrap();
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].0, "AM Peak");

        assert_eq!(store.orphan_speed_count().unwrap(), 0);
        assert_eq!(store.malformed_geometry_count().unwrap(), 0);
    }

    #[test]
    fn malformed_geometry_is_counted() {
        let mut store = Store::open_in_memory().expect("open store");
        let mut bad = link(1);
        bad.geometry = Some("SRID=4326;MULTILINESTRING((0 0, 1 1))".to_string());
        store.insert_links(&[bad], 100).unwrap();

        assert_eq!(store.malformed_geometry_count().unwrap(), 1);
    }

    #[test]
    fn file_persistence() {
        let tmpdir = tempfile::tempdir().unwrap();
        let db_path = tmpdir.path().join("velo.duckdb");
        let db_str = db_path.to_str().unwrap();

        {
            let mut store = Store::open(db_str).expect("open file-backed store");
            store.insert_links(&[link(7)], 100).unwrap();
        }

        {
            let store = Store::open(db_str).expect("reopen store");
            assert_eq!(store.count_links().unwrap(), 1);
        }
    }
}
