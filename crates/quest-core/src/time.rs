//! Lightweight UTC calendar dates (no chrono dependency).
//!
//! Uses Howard Hinnant's civil_from_days / days_from_civil algorithms for
//! conversion between Unix epoch days and (year, month, day).

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A calendar date, stored as days since 1970-01-01.
///
/// Ordering follows the calendar, and the `YYYY-MM-DD` rendering sorts
/// lexicographically in the same order, which the store relies on for
/// date-range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    days: i64,
}

impl Date {
    pub fn from_days(days: i64) -> Self {
        Self { days }
    }

    /// Build a date from its civil parts. Returns `None` for impossible dates.
    pub fn from_ymd(year: i64, month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self {
            days: days_from_civil(year, month as u64, day as u64),
        })
    }

    /// Today's date in UTC.
    pub fn today() -> Self {
        Self::from_days((now_unix_secs() / 86400) as i64)
    }

    pub fn days_since_epoch(self) -> i64 {
        self.days
    }

    pub fn ymd(self) -> (i64, u32, u32) {
        let (y, m, d) = civil_from_days(self.days);
        (y, m as u32, d as u32)
    }

    pub fn year(self) -> i64 {
        self.ymd().0
    }

    pub fn minus_days(self, n: i64) -> Self {
        Self::from_days(self.days - n)
    }

    pub fn plus_days(self, n: i64) -> Self {
        Self::from_days(self.days + n)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (y, m, d) = self.ymd();
        write!(f, "{y:04}-{m:02}-{d:02}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDateError(String);

impl fmt::Display for ParseDateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date '{}', expected YYYY-MM-DD", self.0)
    }
}

impl std::error::Error for ParseDateError {}

impl FromStr for Date {
    type Err = ParseDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDateError(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let year = parts.next().and_then(|p| p.parse::<i64>().ok()).ok_or_else(err)?;
        let month = parts.next().and_then(|p| p.parse::<u32>().ok()).ok_or_else(err)?;
        // Tolerate a trailing time component ("2026-03-01T00:00:00Z" or "2026-03-01 09:00:00").
        let day = parts
            .next()
            .map(|p| p.split(['T', ' ']).next().unwrap_or(p))
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(err)?;
        Date::from_ymd(year, month, day).ok_or_else(err)
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        _ => 28,
    }
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Inverse of `civil_from_days`.
fn days_from_civil(year: i64, month: u64, day: u64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(Date::from_days(0).to_string(), "1970-01-01");
    }

    #[test]
    fn test_known_date() {
        // 2026-02-21T00:00:00Z = 1771632000
        assert_eq!(Date::from_days(1771632000 / 86400).to_string(), "2026-02-21");
    }

    #[test]
    fn test_civil_roundtrip_across_leap_years() {
        for days in [-800_000, -1, 0, 59, 60, 11_016, 20_505, 400_000] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days, "day {days}");
        }
    }

    #[test]
    fn test_parse_and_display() {
        let date: Date = "2024-02-29".parse().unwrap();
        assert_eq!(date.to_string(), "2024-02-29");
        assert_eq!(date.year(), 2024);
        assert_eq!(date.plus_days(1).to_string(), "2024-03-01");
        assert_eq!(date.minus_days(59).to_string(), "2024-01-01");
    }

    #[test]
    fn test_parse_tolerates_time_suffix() {
        let date: Date = "2026-03-01T09:30:00Z".parse().unwrap();
        assert_eq!(date, Date::from_ymd(2026, 3, 1).unwrap());
        let date: Date = "2026-03-01 09:30:00".parse().unwrap();
        assert_eq!(date, Date::from_ymd(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!("2023-02-29".parse::<Date>().is_err());
        assert!("2026-13-01".parse::<Date>().is_err());
        assert!("yesterday".parse::<Date>().is_err());
        assert!("".parse::<Date>().is_err());
    }

    #[test]
    fn test_string_order_matches_date_order() {
        let a = Date::from_ymd(2025, 12, 31).unwrap();
        let b = Date::from_ymd(2026, 1, 1).unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_today_is_recent() {
        assert!(Date::today().year() >= 2024);
    }
}
