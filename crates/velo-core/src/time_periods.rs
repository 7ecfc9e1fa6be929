//! The fixed time-period code table and day-of-week naming.
//!
//! Speed sources tag each observation with an integer period code 1-7. The
//! table below is static; codes outside it resolve to no period rather than
//! an error.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// A named slice of the day, keyed by the source's integer period code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    Overnight,
    EarlyMorning,
    AmPeak,
    Midday,
    EarlyAfternoon,
    PmPeak,
    Evening,
}

impl TimePeriod {
    /// All periods in code order.
    pub const ALL: [Self; 7] = [
        Self::Overnight,
        Self::EarlyMorning,
        Self::AmPeak,
        Self::Midday,
        Self::EarlyAfternoon,
        Self::PmPeak,
        Self::Evening,
    ];

    /// Resolve a source period code. Codes outside 1-7 yield `None`.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Overnight),
            2 => Some(Self::EarlyMorning),
            3 => Some(Self::AmPeak),
            4 => Some(Self::Midday),
            5 => Some(Self::EarlyAfternoon),
            6 => Some(Self::PmPeak),
            7 => Some(Self::Evening),
            _ => None,
        }
    }

    /// The source's integer code for this period.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Overnight => 1,
            Self::EarlyMorning => 2,
            Self::AmPeak => 3,
            Self::Midday => 4,
            Self::EarlyAfternoon => 5,
            Self::PmPeak => 6,
            Self::Evening => 7,
        }
    }

    /// Display name as persisted in the `time_period` column.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Overnight => "Overnight",
            Self::EarlyMorning => "Early Morning",
            Self::AmPeak => "AM Peak",
            Self::Midday => "Midday",
            Self::EarlyAfternoon => "Early Afternoon",
            Self::PmPeak => "PM Peak",
            Self::Evening => "Evening",
        }
    }

    /// Inclusive hour range covered by this period.
    #[must_use]
    pub const fn hour_range(self) -> (u32, u32) {
        match self {
            Self::Overnight => (0, 3),
            Self::EarlyMorning => (4, 6),
            Self::AmPeak => (7, 9),
            Self::Midday => (10, 12),
            Self::EarlyAfternoon => (13, 15),
            Self::PmPeak => (16, 18),
            Self::Evening => (19, 23),
        }
    }

    /// Classify an hour of day (0-23) into its period.
    #[must_use]
    pub fn for_hour(hour: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| {
            let (start, end) = p.hour_range();
            hour >= start && hour <= end
        })
    }
}

/// English day name as persisted in the `day_of_week` column.
#[must_use]
pub const fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
