//! Business timezone helpers
//!
//! Timestamps are stored as Unix millis; working-hour windows are `HH:MM`
//! wall-clock times in the business timezone.

use chrono::{NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::inventory::{InventoryError, InventoryResult};

/// Parse an `HH:MM` wall-clock time
pub fn parse_hhmm(value: &str) -> InventoryResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| InventoryError::Validation(format!("Invalid time format (HH:MM): {value}")))
}

/// Wall-clock time of a Unix millis instant in the business timezone
pub fn local_time(millis: i64, tz: Tz) -> NaiveTime {
    match tz.timestamp_millis_opt(millis).earliest() {
        Some(dt) => dt.time(),
        None => NaiveTime::MIN,
    }
}

/// Parse a timezone name, falling back to UTC
pub fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone '{}', falling back to UTC", name);
        Tz::UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hhmm() {
        assert_eq!(
            parse_hhmm("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert!(parse_hhmm("8h").is_err());
        assert!(parse_hhmm("25:00").is_err());
    }

    #[test]
    fn converts_to_business_timezone() {
        // 2024-01-15T12:00:00Z is 13:00 in Madrid (CET, UTC+1)
        let millis = 1_705_320_000_000;
        let madrid: Tz = "Europe/Madrid".parse().unwrap();
        assert_eq!(
            local_time(millis, madrid),
            NaiveTime::from_hms_opt(13, 0, 0).unwrap()
        );
        assert_eq!(
            local_time(millis, Tz::UTC),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Mars/Olympus"), Tz::UTC);
    }
}
