// Expense aggregation over closed time windows.
//
// Everything here is a pure function of its inputs: "now" and the time zone
// are always passed in by the caller, never read from the system clock, so
// day/week/zone boundaries are testable deterministically.

use chrono::{DateTime, Days, NaiveDate, TimeZone};

use crate::db::Expense;

/// Sum of amounts whose timestamp falls inside `[start_ms, end_ms]`,
/// inclusive on both ends. An empty match set sums to exactly 0.
pub fn total_in_window(expenses: &[Expense], start_ms: i64, end_ms: i64) -> f64 {
    expenses
        .iter()
        .filter(|e| e.timestamp_ms >= start_ms && e.timestamp_ms <= end_ms)
        .map(|e| e.amount)
        .sum()
}

/// Total over the trailing-days window: from the start of the local day
/// `days - 1` days before `now`, through `now` itself.
///
/// `days <= 0` yields 0 without inspecting the records.
pub fn total_for_trailing_days<Tz: TimeZone>(
    expenses: &[Expense],
    days: i64,
    now: DateTime<Tz>,
) -> f64 {
    if days <= 0 {
        return 0.0;
    }

    // Calendar-aware step back, so a window spanning a DST change still
    // starts at a local midnight.
    let anchor = match now.clone().checked_sub_days(Days::new((days - 1) as u64)) {
        Some(dt) => dt,
        None => return 0.0,
    };

    let start = start_of_local_day(&anchor);
    total_in_window(expenses, start.timestamp_millis(), now.timestamp_millis())
}

/// Total over the local calendar day containing `instant`, in `instant`'s
/// own zone: `[start of day, start of next day - 1ms]`.
///
/// Cheap enough to recompute on every screen refresh; deliberately not
/// cached, so a midnight rollover is never shown stale.
pub fn total_for_calendar_day<Tz: TimeZone>(expenses: &[Expense], instant: DateTime<Tz>) -> f64 {
    let zone = instant.timezone();
    let date = instant.date_naive();

    let start_ms = start_of_day_on(&zone, date).timestamp_millis();
    let end_ms = match date.succ_opt() {
        Some(next) => start_of_day_on(&zone, next).timestamp_millis() - 1,
        None => i64::MAX,
    };

    total_in_window(expenses, start_ms, end_ms)
}

/// First instant of the local day containing `instant`.
pub fn start_of_local_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Tz> {
    start_of_day_on(&instant.timezone(), instant.date_naive())
}

/// First valid instant of `date` in `zone`. When a DST gap swallows local
/// midnight, scans forward hour by hour to the earliest valid local time.
fn start_of_day_on<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> DateTime<Tz> {
    for hour in 0..24 {
        if let Some(naive) = date.and_hms_opt(hour, 0, 0) {
            if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
                return dt;
            }
        }
    }

    // A whole day cannot be invalid; interpret midnight as UTC as a last resort.
    zone.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}
