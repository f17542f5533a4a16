//! Shop open/closed evaluation against `HH:MM` opening hours.
//!
//! Hours are compared as minutes since midnight with both ends inclusive.
//! A close time earlier than the open time is NOT treated as running past
//! midnight: the range is empty and the shop reports closed.

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    /// Parse an `HH:MM` string (a single-digit hour is accepted).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeOfDay`] when the string is not two
    /// colon-separated numbers or the values are out of range.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidTimeOfDay(raw.to_string());
        let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }

    #[must_use]
    pub fn from_naive_time(time: NaiveTime) -> Self {
        // hour() < 24 and minute() < 60, both fit in u8.
        Self {
            hour: u8::try_from(time.hour()).unwrap_or(0),
            minute: u8::try_from(time.minute()).unwrap_or(0),
        }
    }

    #[must_use]
    pub fn minutes(self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Minutes since midnight for an `HH:MM` string.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimeOfDay`] if `raw` does not parse.
pub fn minutes_since_midnight(raw: &str) -> Result<u16, CoreError> {
    TimeOfDay::parse(raw).map(TimeOfDay::minutes)
}

/// Reports whether a shop with the given hours is open at `now`.
///
/// Open iff `open <= now <= close`, in minutes since midnight.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimeOfDay`] if either bound fails to parse.
pub fn is_open_at(open: &str, close: &str, now: TimeOfDay) -> Result<bool, CoreError> {
    let open = minutes_since_midnight(open)?;
    let close = minutes_since_midnight(close)?;
    let now = now.minutes();
    Ok(now >= open && now <= close)
}

/// Returns `true` when `close` is earlier than `open`, i.e. hours that would
/// need wraparound to make sense.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimeOfDay`] if either bound fails to parse.
pub fn spans_midnight(open: &str, close: &str) -> Result<bool, CoreError> {
    Ok(minutes_since_midnight(close)? < minutes_since_midnight(open)?)
}

/// Wall-clock time-of-day at the shops' UTC offset.
#[must_use]
pub fn local_time_of_day(now: DateTime<Utc>, utc_offset_minutes: i32) -> TimeOfDay {
    let local = FixedOffset::east_opt(utc_offset_minutes * 60)
        .map_or_else(|| now.time(), |offset| now.with_timezone(&offset).time());
    TimeOfDay::from_naive_time(local)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u8, minute: u8) -> TimeOfDay {
        TimeOfDay { hour, minute }
    }

    #[test]
    fn open_window_is_inclusive_on_both_ends() {
        assert!(is_open_at("07:00", "21:00", at(8, 0)).unwrap());
        assert!(is_open_at("07:00", "21:00", at(7, 0)).unwrap());
        assert!(is_open_at("07:00", "21:00", at(21, 0)).unwrap());
        assert!(!is_open_at("07:00", "21:00", at(21, 1)).unwrap());
        assert!(!is_open_at("07:00", "21:00", at(6, 59)).unwrap());
    }

    #[test]
    fn overnight_hours_report_closed() {
        assert!(!is_open_at("22:00", "02:00", at(23, 0)).unwrap());
        assert!(!is_open_at("22:00", "02:00", at(1, 0)).unwrap());
        assert!(spans_midnight("22:00", "02:00").unwrap());
        assert!(!spans_midnight("07:00", "21:00").unwrap());
    }

    #[test]
    fn parse_rejects_malformed_times() {
        for bad in [
            "", "7", "07-00", "24:00", "12:60", "12:5", "ab:cd", "123:00", "+7:00", "07:+5",
            "7: 05",
        ] {
            assert!(TimeOfDay::parse(bad).is_err(), "expected '{bad}' to fail");
        }
    }

    #[test]
    fn parse_accepts_single_digit_hour() {
        assert_eq!(TimeOfDay::parse("7:05").unwrap(), at(7, 5));
        assert_eq!(TimeOfDay::parse("23:59").unwrap().minutes(), 1439);
    }

    #[test]
    fn invalid_bound_is_an_error_not_closed() {
        let err = is_open_at("7am", "21:00", at(8, 0)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeOfDay(ref s) if s == "7am"));
    }

    #[test]
    fn display_zero_pads() {
        assert_eq!(at(7, 5).to_string(), "07:05");
    }

    #[test]
    fn local_time_applies_offset() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 23, 30, 0).unwrap();
        assert_eq!(local_time_of_day(now, 420), at(6, 30));
        assert_eq!(local_time_of_day(now, 0), at(23, 30));
        assert_eq!(local_time_of_day(now, -60), at(22, 30));
    }
}
