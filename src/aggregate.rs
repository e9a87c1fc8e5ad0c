// src/aggregate.rs
//
// Derived-field computation. These are deliberately pure: the workflow calls
// them explicitly before every write, so a persisted record can never carry a
// stale total.

use chrono::{Duration, NaiveDate};

use crate::model::TimesheetEntry;

/// Sum of entry hours; zero for an empty sheet.
pub fn total_hours(entries: &[TimesheetEntry]) -> f64 {
    entries.iter().map(|e| e.hours).sum()
}

/// Inclusive day span of a request. from == to counts as one day.
pub fn days_requested(from_date: NaiveDate, to_date: NaiveDate) -> i64 {
    (to_date - from_date).num_days() + 1
}

/// A timesheet week always runs start..start+6.
pub fn week_end(week_start_date: NaiveDate) -> NaiveDate {
    week_start_date + Duration::days(6)
}

/// Inclusive-bounds interval overlap: two requests collide when they share at
/// least one calendar day.
pub fn intervals_overlap(
    a_from: NaiveDate,
    a_to: NaiveDate,
    b_from: NaiveDate,
    b_to: NaiveDate,
) -> bool {
    a_from <= b_to && a_to >= b_from
}
