//! GeoJSON to single-part LINESTRING normalization.
//!
//! Policy: a `LineString` is accepted as-is; a `MultiLineString` is reduced
//! to its **first** constituent part; anything else — parse failures, other
//! geometry types, empty collections, degenerate coordinate lists — is
//! invalid. A link with invalid geometry is unusable for downstream spatial
//! queries, so the whole row is skipped rather than inserted with NULL.
//!
//! Pure transform: errors never propagate, they collapse into `None`.

use geo_types::{Geometry, LineString};
use wkt::ToWkt;

use velo_core::SRID_WGS84;

/// Normalize a serialized GeoJSON geometry into EWKT
/// (`SRID=4326;LINESTRING(...)`), or `None` if the row's geometry is invalid.
#[must_use]
pub fn normalize_geojson(raw: Option<&str>) -> Option<String> {
    let geometry: geojson::Geometry = raw?.parse().ok()?;
    let geometry = Geometry::<f64>::try_from(geometry).ok()?;
    let line = single_linestring(geometry)?;
    Some(format!("SRID={SRID_WGS84};{}", line.wkt_string()))
}

/// Reduce a geometry to one non-degenerate `LineString`.
fn single_linestring(geometry: Geometry<f64>) -> Option<LineString<f64>> {
    let line = match geometry {
        Geometry::LineString(line) => line,
        Geometry::MultiLineString(multi) => multi.0.into_iter().next()?,
        _ => return None,
    };
    // A linestring needs at least two points; an empty coordinate list is
    // the "empty collection" case.
    if line.0.len() < 2 {
        return None;
    }
    Some(line)
}
