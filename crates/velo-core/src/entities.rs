//! Road-link and speed-record entities as persisted by the store.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Spatial reference id for geographic (longitude/latitude) coordinates.
pub const SRID_WGS84: i32 = 4326;

/// A road segment with a single-part LINESTRING geometry.
///
/// `geometry` holds EWKT text (`SRID=4326;LINESTRING(...)`). The pipeline
/// never inserts a link whose geometry failed normalization, so in practice
/// the column is only NULL for rows written by other tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Source-supplied unique identifier. Never generated.
    pub link_id: i64,
    /// Single-part LINESTRING as EWKT, SRID 4326.
    pub geometry: Option<String>,
    /// Display name of the road.
    pub road_name: Option<String>,
    /// Segment length in meters.
    pub length: Option<f64>,
    /// Not present in the link dataset; always `None` at ingestion time.
    pub road_type: Option<String>,
    /// Not present in the link dataset; always `None` at ingestion time.
    pub speed_limit: Option<i32>,
}

/// One speed observation tied to a [`Link`].
///
/// The row id is sequence-generated by the store; entities carry only the
/// payload columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedRecord {
    /// Must reference an existing `links.link_id` at write time.
    pub link_id: i64,
    /// Measurement instant, timezone-naive (source timestamps are local).
    pub timestamp: NaiveDateTime,
    /// Measured speed in mph.
    pub speed: f64,
    /// Derived from `timestamp` (`Monday`..`Sunday`).
    pub day_of_week: Option<String>,
    /// Named time period from the 1-7 code table; `None` for unknown codes.
    pub time_period: Option<String>,
}
