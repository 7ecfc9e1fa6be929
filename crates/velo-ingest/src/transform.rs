//! Raw row to entity transformers.
//!
//! Each transformer consumes one raw row and yields `RowResult`: an entity
//! ready for the writer, or a skip with its reason. Nothing here touches the
//! database; the speed transformer checks references against the in-memory
//! index only.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use velo_core::{Link, RowResult, SkipReason, SpeedRecord, TimePeriod, day_name};

use crate::geometry::normalize_geojson;
use crate::source::{RawLinkRow, RawSpeedRow};

/// Lenient integer coercion: plain integers plus whole-number floats
/// ("42", "42.0"), the way loosely-typed columnar sources spell ids.
#[allow(clippy::cast_possible_truncation)]
fn coerce_i64(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9e18 {
        Some(f as i64)
    } else {
        None
    }
}

/// Lenient float coercion; non-finite values are rejected.
fn coerce_f64(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp string in any of the formats the sources use.
/// Date-only values resolve to midnight.
fn coerce_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let s = raw?.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Transform one raw link row.
///
/// Invalid geometry skips the whole row: a link without geometry is
/// unusable downstream. An unparsable `link_id` also skips (identity is
/// mandatory). A bad `_length` only nulls the field.
#[must_use]
pub fn transform_link(raw: &RawLinkRow) -> RowResult<Link> {
    let Some(geometry) = normalize_geojson(raw.geo_json.as_deref()) else {
        return RowResult::Skip(SkipReason::InvalidGeometry);
    };
    let Some(link_id) = coerce_i64(raw.link_id.as_deref()) else {
        return RowResult::Skip(SkipReason::BadLinkId);
    };
    RowResult::Row(Link {
        link_id,
        geometry: Some(geometry),
        road_name: raw.road_name.clone(),
        length: coerce_f64(raw.length.as_deref()),
        // Not present in this source.
        road_type: None,
        speed_limit: None,
    })
}

/// Transform one raw speed row against the referential index.
///
/// A `link_id` that does not parse, or parses to an id absent from the
/// index, is an unknown link. Period codes outside the table null the
/// `time_period` field without skipping.
#[must_use]
pub fn transform_speed(raw: &RawSpeedRow, link_index: &HashSet<i64>) -> RowResult<SpeedRecord> {
    let link_id = match coerce_i64(raw.link_id.as_deref()) {
        Some(id) if link_index.contains(&id) => id,
        _ => return RowResult::Skip(SkipReason::UnknownLink),
    };
    let Some(timestamp) = coerce_timestamp(raw.date_time.as_deref()) else {
        return RowResult::Skip(SkipReason::BadTimestamp);
    };
    let Some(speed) = coerce_f64(raw.average_speed.as_deref()) else {
        return RowResult::Skip(SkipReason::BadSpeed);
    };
    let time_period = coerce_i64(raw.period.as_deref())
        .and_then(TimePeriod::from_code)
        .map(|p| p.name().to_string());
    RowResult::Row(SpeedRecord {
        link_id,
        timestamp,
        speed,
        day_of_week: Some(day_name(timestamp.weekday()).to_string()),
        time_period,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const GEO: &str = r#"{"type":"LineString","coordinates":[[-81.65,30.33],[-81.64,30.34]]}"#;

    fn raw_link(link_id: &str, geo: Option<&str>, length: Option<&str>) -> RawLinkRow {
        RawLinkRow {
            link_id: Some(link_id.to_string()),
            geo_json: geo.map(str::to_string),
            road_name: Some("Main St".to_string()),
            length: length.map(str::to_string),
        }
    }

    fn raw_speed(link_id: &str, date_time: &str, speed: &str, period: Option<&str>) -> RawSpeedRow {
        RawSpeedRow {
            link_id: Some(link_id.to_string()),
            date_time: Some(date_time.to_string()),
            average_speed: Some(speed.to_string()),
            period: period.map(str::to_string),
        }
    }

    fn index(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn valid_link_row_transforms() {
        let result = transform_link(&raw_link("42", Some(GEO), Some("120.5")));
        let RowResult::Row(link) = result else {
            panic!("expected a link");
        };
        assert_eq!(link.link_id, 42);
        assert!(link.geometry.unwrap().starts_with("SRID=4326;LINESTRING"));
        assert_eq!(link.road_name.as_deref(), Some("Main St"));
        assert_eq!(link.length, Some(120.5));
        assert_eq!(link.road_type, None);
        assert_eq!(link.speed_limit, None);
    }

    #[test]
    fn invalid_geometry_skips_the_row() {
        let result = transform_link(&raw_link("42", None, Some("120.5")));
        assert_eq!(result, RowResult::Skip(SkipReason::InvalidGeometry));

        let result = transform_link(&raw_link("42", Some("{}"), None));
        assert_eq!(result, RowResult::Skip(SkipReason::InvalidGeometry));
    }

    #[test]
    fn bad_link_id_skips_the_row() {
        let result = transform_link(&raw_link("not-a-number", Some(GEO), None));
        assert_eq!(result, RowResult::Skip(SkipReason::BadLinkId));
    }

    #[rstest]
    #[case(Some("garbage"))]
    #[case(Some(""))]
    #[case(None)]
    fn bad_length_nulls_the_field_only(#[case] length: Option<&str>) {
        let result = transform_link(&raw_link("42", Some(GEO), length));
        let RowResult::Row(link) = result else {
            panic!("length must never skip the row");
        };
        assert_eq!(link.length, None);
    }

    #[test]
    fn whole_number_float_ids_coerce() {
        let result = transform_link(&raw_link("42.0", Some(GEO), None));
        let RowResult::Row(link) = result else {
            panic!("expected a link");
        };
        assert_eq!(link.link_id, 42);
    }

    #[test]
    fn valid_speed_row_transforms() {
        let result = transform_speed(
            &raw_speed("42", "2024-01-01 08:15:00", "34.5", Some("3")),
            &index(&[42]),
        );
        let RowResult::Row(record) = result else {
            panic!("expected a record");
        };
        assert_eq!(record.link_id, 42);
        assert!((record.speed - 34.5).abs() < f64::EPSILON);
        // 2024-01-01 was a Monday.
        assert_eq!(record.day_of_week.as_deref(), Some("Monday"));
        assert_eq!(record.time_period.as_deref(), Some("AM Peak"));
    }

    #[test]
    fn unknown_link_skips() {
        let result = transform_speed(
            &raw_speed("42", "2024-01-01 08:15:00", "34.5", Some("3")),
            &index(&[1, 2, 3]),
        );
        assert_eq!(result, RowResult::Skip(SkipReason::UnknownLink));

        // An unparsable id can't be in the index either.
        let result = transform_speed(
            &raw_speed("nope", "2024-01-01 08:15:00", "34.5", Some("3")),
            &index(&[42]),
        );
        assert_eq!(result, RowResult::Skip(SkipReason::UnknownLink));
    }

    #[test]
    fn bad_timestamp_skips() {
        let result = transform_speed(
            &raw_speed("42", "January the first", "34.5", Some("3")),
            &index(&[42]),
        );
        assert_eq!(result, RowResult::Skip(SkipReason::BadTimestamp));
    }

    #[test]
    fn bad_speed_skips() {
        let result = transform_speed(
            &raw_speed("42", "2024-01-01 08:15:00", "fast", Some("3")),
            &index(&[42]),
        );
        assert_eq!(result, RowResult::Skip(SkipReason::BadSpeed));
    }

    #[rstest]
    #[case(Some("0"))]
    #[case(Some("8"))]
    #[case(Some("banana"))]
    #[case(None)]
    fn out_of_table_period_nulls_the_field(#[case] period: Option<&str>) {
        let result = transform_speed(
            &raw_speed("42", "2024-01-01 08:15:00", "34.5", period),
            &index(&[42]),
        );
        let RowResult::Row(record) = result else {
            panic!("period must never skip the row");
        };
        assert_eq!(record.time_period, None);
    }

    #[rstest]
    #[case("2024-01-01 08:15:00")]
    #[case("2024-01-01T08:15:00")]
    #[case("2024-01-01 08:15:00.250")]
    #[case("2024-01-01")]
    fn timestamp_formats_parse(#[case] raw: &str) {
        assert!(coerce_timestamp(Some(raw)).is_some(), "failed: {raw}");
    }
}
