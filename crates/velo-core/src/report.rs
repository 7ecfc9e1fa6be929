//! Per-row results and per-phase accounting.
//!
//! A transformer never raises past its boundary: each row resolves to either
//! an entity or a [`SkipReason`]. The pipeline folds those into a
//! [`PhaseReport`] so that `rows_read == rows_inserted + Σ skips` holds by
//! construction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a source row was not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkipReason {
    /// Geometry was missing, unparsable, empty, or not a (multi)linestring.
    InvalidGeometry,
    /// The mandatory `link_id` field did not parse as an integer.
    BadLinkId,
    /// The `date_time` field did not parse as a timestamp.
    BadTimestamp,
    /// The `average_speed` field did not parse as a number.
    BadSpeed,
    /// The referenced `link_id` is not in the referential index.
    UnknownLink,
    /// The row failed its individual insert after a batch rollback.
    InsertFailed,
}

impl SkipReason {
    /// Stable label used in reports and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidGeometry => "invalid geometry",
            Self::BadLinkId => "bad link id",
            Self::BadTimestamp => "bad timestamp",
            Self::BadSpeed => "bad speed",
            Self::UnknownLink => "unknown link",
            Self::InsertFailed => "insert failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of transforming one source row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowResult<T> {
    /// The row produced an entity ready for the writer.
    Row(T),
    /// The row was dropped; the reason feeds the phase report.
    Skip(SkipReason),
}

/// Accounting for one ingestion phase (links or speeds).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Rows read from the source file.
    pub rows_read: u64,
    /// Rows committed to the store.
    pub rows_inserted: u64,
    /// Skip counts keyed by reason.
    pub skips: BTreeMap<SkipReason, u64>,
}

impl PhaseReport {
    /// Record one skipped row.
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skips.entry(reason).or_insert(0) += 1;
    }

    /// Record several skips of the same reason at once.
    pub fn record_skips(&mut self, reason: SkipReason, count: u64) {
        if count > 0 {
            *self.skips.entry(reason).or_insert(0) += count;
        }
    }

    /// Total rows skipped across all reasons.
    #[must_use]
    pub fn rows_skipped(&self) -> u64 {
        self.skips.values().sum()
    }

    /// Whether every row read is accounted for as inserted or skipped.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.rows_read == self.rows_inserted + self.rows_skipped()
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read {} / inserted {} / skipped {}",
            self.rows_read,
            self.rows_inserted,
            self.rows_skipped()
        )?;
        for (reason, count) in &self.skips {
            write!(f, " [{reason}: {count}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn skip_accounting_balances() {
        let mut report = PhaseReport {
            rows_read: 10,
            rows_inserted: 7,
            ..PhaseReport::default()
        };
        report.record_skip(SkipReason::InvalidGeometry);
        report.record_skip(SkipReason::InvalidGeometry);
        report.record_skip(SkipReason::BadLinkId);

        assert_eq!(report.rows_skipped(), 3);
        assert!(report.is_balanced());
        assert_eq!(report.skips[&SkipReason::InvalidGeometry], 2);
    }

    #[test]
    fn unbalanced_report_is_detected() {
        let report = PhaseReport {
            rows_read: 5,
            rows_inserted: 3,
            ..PhaseReport::default()
        };
        assert!(!report.is_balanced());
    }

    #[test]
    fn record_skips_ignores_zero() {
        let mut report = PhaseReport::default();
        report.record_skips(SkipReason::InsertFailed, 0);
        assert!(report.skips.is_empty());
        report.record_skips(SkipReason::InsertFailed, 4);
        assert_eq!(report.skips[&SkipReason::InsertFailed], 4);
    }

    #[test]
    fn display_includes_reasons() {
        let mut report = PhaseReport {
            rows_read: 2,
            rows_inserted: 1,
            ..PhaseReport::default()
        };
        report.record_skip(SkipReason::UnknownLink);
        let text = report.to_string();
        assert!(text.contains("unknown link: 1"), "got: {text}");
    }
}
