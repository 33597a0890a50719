// Quick timestamp choices for the add-expense flow. "now" is always passed
// in by the caller, same rule as the aggregation engine.

use chrono::{DateTime, NaiveDate, TimeZone, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPreset {
    /// The exact moment of saving.
    Now,
    /// Noon of the current local day.
    Today,
    /// Noon of the Monday starting the current ISO week.
    ThisWeek,
    /// A caller-picked instant, epoch milliseconds.
    Custom(i64),
}

impl TimestampPreset {
    pub fn label(&self) -> &str {
        match self {
            TimestampPreset::Now => "Now",
            TimestampPreset::Today => "Today",
            TimestampPreset::ThisWeek => "This week",
            TimestampPreset::Custom(_) => "Custom",
        }
    }

    /// Cycle through the three quick presets (Custom is only reached by
    /// picking an explicit instant).
    pub fn next(&self) -> Self {
        match self {
            TimestampPreset::Now => TimestampPreset::Today,
            TimestampPreset::Today => TimestampPreset::ThisWeek,
            TimestampPreset::ThisWeek | TimestampPreset::Custom(_) => TimestampPreset::Now,
        }
    }
}

/// Resolve a preset to epoch milliseconds, relative to the caller's `now`.
pub fn timestamp_for_preset<Tz: TimeZone>(preset: TimestampPreset, now: &DateTime<Tz>) -> i64 {
    match preset {
        TimestampPreset::Now => now.timestamp_millis(),
        TimestampPreset::Today => local_noon(&now.timezone(), now.date_naive()),
        TimestampPreset::ThisWeek => {
            let monday = now.date_naive().week(Weekday::Mon).first_day();
            local_noon(&now.timezone(), monday)
        }
        TimestampPreset::Custom(timestamp_ms) => timestamp_ms,
    }
}

fn local_noon<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> i64 {
    match date.and_hms_opt(12, 0, 0) {
        Some(naive) => match zone.from_local_datetime(&naive).earliest() {
            Some(dt) => dt.timestamp_millis(),
            // DST gaps never cover noon in practice; fall back to UTC noon.
            None => zone.from_utc_datetime(&naive).timestamp_millis(),
        },
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn zone_east(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn test_now_is_the_exact_instant() {
        let zone = zone_east(1);
        let now = zone.with_ymd_and_hms(2024, 5, 8, 15, 30, 45).unwrap();

        assert_eq!(
            timestamp_for_preset(TimestampPreset::Now, &now),
            now.timestamp_millis()
        );
    }

    #[test]
    fn test_today_resolves_to_local_noon() {
        let zone = zone_east(1);
        let now = zone.with_ymd_and_hms(2024, 5, 8, 15, 30, 45).unwrap();
        let noon = zone.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();

        assert_eq!(
            timestamp_for_preset(TimestampPreset::Today, &now),
            noon.timestamp_millis()
        );
    }

    #[test]
    fn test_this_week_resolves_to_monday_noon() {
        let zone = zone_east(1);
        // Wednesday 2024-05-08 -> Monday 2024-05-06
        let wednesday = zone.with_ymd_and_hms(2024, 5, 8, 15, 30, 45).unwrap();
        let monday_noon = zone.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap();

        assert_eq!(
            timestamp_for_preset(TimestampPreset::ThisWeek, &wednesday),
            monday_noon.timestamp_millis()
        );

        // Sunday still belongs to the week begun the previous Monday.
        let sunday = zone.with_ymd_and_hms(2024, 5, 12, 9, 0, 0).unwrap();
        assert_eq!(
            timestamp_for_preset(TimestampPreset::ThisWeek, &sunday),
            monday_noon.timestamp_millis()
        );
    }

    #[test]
    fn test_custom_passes_through() {
        let zone = zone_east(0);
        let now = zone.with_ymd_and_hms(2024, 5, 8, 15, 30, 45).unwrap();

        assert_eq!(
            timestamp_for_preset(TimestampPreset::Custom(123_456), &now),
            123_456
        );
    }

    #[test]
    fn test_preset_cycle() {
        assert_eq!(TimestampPreset::Now.next(), TimestampPreset::Today);
        assert_eq!(TimestampPreset::Today.next(), TimestampPreset::ThisWeek);
        assert_eq!(TimestampPreset::ThisWeek.next(), TimestampPreset::Now);
        assert_eq!(TimestampPreset::Custom(7).next(), TimestampPreset::Now);
    }
}
