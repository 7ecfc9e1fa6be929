//! # velo-core
//!
//! Domain types shared across the velo ingestion pipeline: the `Link` and
//! `SpeedRecord` entities, the time-period code table, and the per-row
//! result/accounting types that make skip reasons first-class values instead
//! of log side effects.

pub mod entities;
pub mod report;
pub mod time_periods;

pub use entities::{Link, SpeedRecord, SRID_WGS84};
pub use report::{PhaseReport, RowResult, SkipReason};
pub use time_periods::{day_name, TimePeriod};
