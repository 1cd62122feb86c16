// Local-day bucketing of UTC minute timestamps.
//
// Archive files are cut at local midnight, so a UTC minute is shifted by the
// configured offset before dividing into day-length buckets. The offset is a
// fixed constant; daylight-saving transitions are not tracked.

use chrono::{Datelike, Local, NaiveDate};

use crate::core::constants::ONEDAY_M;
use crate::core::error::{EnvLogError, Result};

const DAY_KEY_FMT: &str = "%Y%m%d";
// NaiveDate::num_days_from_ce() of 1970-01-01
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayClock {
    utc_offset_minutes: i64,
}

impl DayClock {
    pub fn new(utc_offset_minutes: i64) -> Self {
        Self { utc_offset_minutes }
    }

    /// Offset of the host's local timezone right now.
    pub fn local() -> Self {
        let secs = Local::now().offset().local_minus_utc();
        Self::new(i64::from(secs) / 60)
    }

    pub fn utc_offset_minutes(&self) -> i64 {
        self.utc_offset_minutes
    }

    fn day_index(&self, minute: i64) -> i64 {
        minute.saturating_add(self.utc_offset_minutes).div_euclid(ONEDAY_M)
    }

    /// UTC minute of local midnight for the day containing `minute`.
    pub fn day_start(&self, minute: i64) -> i64 {
        self.day_index(minute)
            .saturating_mul(ONEDAY_M)
            .saturating_sub(self.utc_offset_minutes)
    }

    /// `YYYYMMDD` of the local day containing `minute`.
    pub fn day_key(&self, minute: i64) -> String {
        let days = EPOCH_DAYS_FROM_CE + self.day_index(minute);
        i32::try_from(days)
            .ok()
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(|d| d.format(DAY_KEY_FMT).to_string())
            .unwrap_or_default()
    }

    pub fn day_key_of_timestamp(&self, timestamp: i64) -> String {
        self.day_key(timestamp.div_euclid(60))
    }

    /// UTC minute of local midnight for a `YYYYMMDD` key.
    pub fn day_start_of_key(&self, key: &str) -> Result<i64> {
        let date = NaiveDate::parse_from_str(key, DAY_KEY_FMT)
            .map_err(|_| EnvLogError::InvalidDayKey(key.to_string()))?;
        let days = i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE;
        Ok(days * ONEDAY_M - self.utc_offset_minutes)
    }

    /// Keys of every local day touched by `[start, end)`, oldest first.
    pub fn day_keys(&self, start: i64, end: i64) -> Vec<String> {
        if start >= end {
            return Vec::new();
        }
        let last = self.day_start(end - 1);
        let mut day = Some(self.day_start(start));
        let mut keys = Vec::new();
        while let Some(d) = day.filter(|d| *d <= last) {
            keys.push(self.day_key(d));
            day = d.checked_add(ONEDAY_M);
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JST: i64 = 9 * 60;

    #[test]
    fn test_day_key_utc() {
        let clock = DayClock::new(0);
        assert_eq!(clock.day_key(0), "19700101");
        assert_eq!(clock.day_key(ONEDAY_M - 1), "19700101");
        assert_eq!(clock.day_key(ONEDAY_M), "19700102");
        assert_eq!(clock.day_key(-1), "19691231");
    }

    #[test]
    fn test_day_boundary_is_local_midnight() {
        let clock = DayClock::new(JST);
        let midnight = clock.day_start_of_key("20240101").unwrap();
        // 2024-01-01 00:00 JST == 2023-12-31 15:00 UTC
        assert_eq!(midnight, 1_704_034_800 / 60);
        assert_eq!(clock.day_key(midnight), "20240101");
        assert_eq!(clock.day_key(midnight - 1), "20231231");
        assert_eq!(clock.day_start(midnight + 123), midnight);
    }

    #[test]
    fn test_negative_offset() {
        let clock = DayClock::new(-5 * 60);
        let midnight = clock.day_start_of_key("20240301").unwrap();
        assert_eq!(clock.day_key(midnight), "20240301");
        assert_eq!(clock.day_key(midnight + ONEDAY_M - 1), "20240301");
        assert_eq!(clock.day_key(midnight + ONEDAY_M), "20240302");
    }

    #[test]
    fn test_day_keys_span() {
        let clock = DayClock::new(JST);
        let start = clock.day_start_of_key("20240101").unwrap();
        assert_eq!(clock.day_keys(start, start + ONEDAY_M), vec!["20240101"]);
        assert_eq!(
            clock.day_keys(start + 10, start + ONEDAY_M + 1),
            vec!["20240101", "20240102"]
        );
        assert_eq!(
            clock.day_keys(start - 1, start + 2 * ONEDAY_M),
            vec!["20231231", "20240101", "20240102"]
        );
        assert!(clock.day_keys(start, start).is_empty());
    }

    #[test]
    fn test_day_keys_at_i64_limits() {
        let clock = DayClock::new(JST);
        let keys = clock.day_keys(i64::MAX - 3 * ONEDAY_M, i64::MAX);
        assert!((3..=4).contains(&keys.len()));
        let keys = clock.day_keys(i64::MIN, i64::MIN + ONEDAY_M);
        assert!((1..=2).contains(&keys.len()));
    }

    #[test]
    fn test_invalid_key() {
        let clock = DayClock::new(0);
        assert!(matches!(
            clock.day_start_of_key("2024-01-01"),
            Err(EnvLogError::InvalidDayKey(_))
        ));
    }
}
