//! DuckDB table DDL for the destination tables.
//!
//! Geometry is stored as EWKT text (`SRID=4326;LINESTRING(...)`), the same
//! source-of-truth representation the spatial layer consumes. The foreign key
//! on `speed_records.link_id` is a backstop; the pipeline enforces the
//! reference in memory before any batch is attempted.

/// Sequence backing the `speed_records.id` primary key.
pub const CREATE_SEQUENCES: &str = "
CREATE SEQUENCE IF NOT EXISTS speed_records_id_seq;
";

/// Road links table. `link_id` is source-supplied, never generated.
pub const CREATE_LINKS: &str = "
CREATE TABLE IF NOT EXISTS links (
    link_id BIGINT PRIMARY KEY,
    geometry TEXT,
    road_name TEXT,
    length DOUBLE,
    road_type TEXT,
    speed_limit INTEGER
);
";

/// Speed observations table, one row per measurement.
pub const CREATE_SPEED_RECORDS: &str = "
CREATE TABLE IF NOT EXISTS speed_records (
    id BIGINT PRIMARY KEY DEFAULT nextval('speed_records_id_seq'),
    link_id BIGINT NOT NULL REFERENCES links(link_id),
    timestamp TIMESTAMP NOT NULL,
    speed DOUBLE NOT NULL,
    day_of_week TEXT,
    time_period TEXT
);
";

/// Indexes backing the read-heavy aggregation queries.
pub const CREATE_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_links_road_name
    ON links(road_name);
CREATE INDEX IF NOT EXISTS idx_speed_link_timestamp
    ON speed_records(link_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_speed_day_period
    ON speed_records(day_of_week, time_period);
";
