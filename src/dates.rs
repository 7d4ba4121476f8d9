//! Search window arithmetic.
//!
//! `months` counts calendar months including the current one: 0 and 1 both
//! mean "the current month", 2 adds the previous month, and so on. The site's
//! date picker takes `%m/%d/%Y` strings, so formatting lives here too.

use chrono::{Datelike, NaiveDate};

/// Inclusive date window for the search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn start_mdy(&self) -> String {
        self.start.format("%m/%d/%Y").to_string()
    }

    pub fn end_mdy(&self) -> String {
        self.end.format("%m/%d/%Y").to_string()
    }
}

/// Compute the filter window ending at `today`.
///
/// `today` is injected rather than read from the system clock so callers and
/// tests control it. Always succeeds; `start <= end` holds for every input.
pub fn search_window(months: u32, today: NaiveDate) -> DateRange {
    let offset = months.saturating_sub(1);
    let start = if offset == 0 {
        today.with_day(1).expect("day 1 exists in every month")
    } else {
        shift_months_back(today, offset)
    };
    DateRange { start, end: today }
}

/// Shift a date back by whole calendar months, preserving the day-of-month.
/// When the target month is shorter, the day clamps to its last valid day.
fn shift_months_back(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 - months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first of month is valid");
    first_of_next.pred_opt().expect("not before year zero").day()
}
