//! Trip status, days-info and duration as shown on trip cards and detail pages.
//!
//! Dates are taken at midnight and compared against the evaluation instant, so
//! a trip ending today already counts as completed once the day has started.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl TripStatus {
    pub const ALL: [TripStatus; 3] = [
        TripStatus::Upcoming,
        TripStatus::Ongoing,
        TripStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Upcoming => "upcoming",
            TripStatus::Ongoing => "ongoing",
            TripStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw.trim())
            .ok_or_else(|| format!("unknown trip status `{raw}`"))
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn span_millis(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    (later - earlier).num_milliseconds()
}

fn ceil_days(millis: i64) -> i64 {
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        whole
    } else {
        whole + 1
    }
}

fn floor_days(millis: i64) -> i64 {
    millis.div_euclid(MILLIS_PER_DAY)
}

fn plural_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

pub fn trip_status(now: NaiveDateTime, start: NaiveDate, end: NaiveDate) -> TripStatus {
    if now < midnight(start) {
        TripStatus::Upcoming
    } else if now > midnight(end) {
        TripStatus::Completed
    } else {
        TripStatus::Ongoing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaysInfo {
    pub status: TripStatus,
    pub days: i64,
}

impl fmt::Display for DaysInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.status {
            TripStatus::Upcoming => "to go",
            TripStatus::Completed => "ago",
            TripStatus::Ongoing => "left",
        };
        write!(f, "{} {suffix}", plural_days(self.days))
    }
}

pub fn days_info(now: NaiveDateTime, start: NaiveDate, end: NaiveDate) -> DaysInfo {
    let status = trip_status(now, start, end);
    let days = match status {
        TripStatus::Upcoming => ceil_days(span_millis(midnight(start), now)),
        TripStatus::Completed => floor_days(span_millis(now, midnight(end))),
        TripStatus::Ongoing => ceil_days(span_millis(midnight(end), now)),
    };
    DaysInfo { status, days }
}

/// Number of days covered by the trip, both endpoints included.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ceil_days(span_millis(midnight(end), midnight(start))) + 1
}

pub fn duration_text(start: NaiveDate, end: NaiveDate) -> String {
    plural_days(duration_days(start, end))
}

/// Everything a trip card shows about timing. Absent when either date is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSchedule {
    pub status: TripStatus,
    pub days_info: DaysInfo,
    pub duration_days: i64,
}

impl TripSchedule {
    pub fn from_dates(
        now: NaiveDateTime,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Option<Self> {
        let (start, end) = (start?, end?);
        let days_info = days_info(now, start, end);
        Some(Self {
            status: days_info.status,
            days_info,
            duration_days: duration_days(start, end),
        })
    }

    pub fn duration_text(&self) -> String {
        plural_days(self.duration_days)
    }
}
