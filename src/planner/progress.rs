use chrono::NaiveDateTime;

use crate::{
    models::{destination::Destination, trip::Trip},
    planner::status::{TripSchedule, TripStatus},
};

/// `round(100 * completed / total)`, or 0 when there is nothing to complete.
pub fn progress_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = completed.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

pub fn destination_progress(destinations: &[Destination]) -> u8 {
    let completed = destinations
        .iter()
        .filter(|destination| destination.fields.is_completed)
        .count();
    progress_percentage(completed, destinations.len())
}

/// Dashboard counters over a user's trips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripStats {
    pub total: usize,
    pub upcoming: usize,
    pub ongoing: usize,
    pub completed: usize,
    pub unscheduled: usize,
    pub favorites: usize,
}

impl TripStats {
    pub fn collect(now: NaiveDateTime, trips: &[Trip]) -> Self {
        let mut stats = Self {
            total: trips.len(),
            ..Self::default()
        };
        for trip in trips {
            if trip.fields.is_favorite {
                stats.favorites += 1;
            }
            match TripSchedule::from_dates(now, trip.fields.start_date, trip.fields.end_date)
                .map(|schedule| schedule.status)
            {
                Some(TripStatus::Upcoming) => stats.upcoming += 1,
                Some(TripStatus::Ongoing) => stats.ongoing += 1,
                Some(TripStatus::Completed) => stats.completed += 1,
                None => stats.unscheduled += 1,
            }
        }
        stats
    }
}
