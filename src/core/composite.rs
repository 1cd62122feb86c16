// View compositor: stitch archive days and the active buffer into one window

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::core::buffer::ActiveBuffer;
use crate::core::cache::ArchiveCache;
use crate::core::calendar::DayClock;
use crate::core::constants::DEF_RANGE_M;
use crate::core::format::Sample;

/// Requested range. Without an anchor the window follows the newest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    pub range_minutes: i64,
    #[serde(default)]
    pub anchor_minute: Option<i64>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            range_minutes: DEF_RANGE_M,
            anchor_minute: None,
        }
    }
}

impl ViewOptions {
    pub fn latest(range_minutes: i64) -> Self {
        Self {
            range_minutes,
            anchor_minute: None,
        }
    }

    pub fn fixed(anchor_minute: i64, range_minutes: i64) -> Self {
        Self {
            range_minutes,
            anchor_minute: Some(anchor_minute),
        }
    }

    /// Range limited to `1..=max_range_minutes`.
    pub fn clamped(self, max_range_minutes: i64) -> Self {
        Self {
            range_minutes: self.range_minutes.clamp(1, max_range_minutes.max(1)),
            ..self
        }
    }
}

/// `[start, end)` in UTC minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

impl Window {
    /// Latest mode ends one minute past the newest buffered sample and is
    /// undefined while the buffer is empty.
    /// A window whose bounds overflow `i64` does not resolve either.
    pub fn resolve(buffer: &ActiveBuffer, view: &ViewOptions) -> Option<Self> {
        match view.anchor_minute {
            Some(start) => Some(Self {
                start,
                end: start.checked_add(view.range_minutes)?,
            }),
            None => {
                let end = buffer.latest_minute()?.checked_add(1)?;
                Some(Self {
                    start: end.checked_sub(view.range_minutes)?,
                    end,
                })
            }
        }
    }

    pub fn contains(&self, minute: i64) -> bool {
        self.start <= minute && minute < self.end
    }
}

/// Slice of `records` whose minutes lie in `[start, end)`: from the first
/// record at or after `start` to the last record before `end`.
pub fn cut_records<T: Borrow<Sample>>(records: &[T], start: i64, end: i64) -> &[T] {
    let minute = |r: &T| <T as Borrow<Sample>>::borrow(r).minute();

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        if start <= minute(first) && minute(last) < end {
            return records;
        }
    }

    let Some(s) = records.iter().position(|r| minute(r) >= start) else {
        return &[];
    };
    let Some(e) = records.iter().rposition(|r| minute(r) < end) else {
        return &[];
    };
    if e < s {
        return &[];
    }
    &records[s..=e]
}

/// Build the ordered sample sequence for `view`.
///
/// Days before the buffer's first minute come from the archive cache (absent
/// days are gaps); the buffer supplies everything after the last archived
/// minute. An otherwise empty result falls back to the newest buffered sample.
pub fn composite(
    buffer: &ActiveBuffer,
    cache: &ArchiveCache,
    clock: &DayClock,
    view: &ViewOptions,
) -> Vec<Sample> {
    let Some(window) = Window::resolve(buffer, view) else {
        return Vec::new();
    };

    let active_start = buffer.earliest_minute().unwrap_or(i64::MAX);
    let archive_end = window.end.min(active_start);

    let mut merged: Vec<Sample> = Vec::new();
    if window.start < archive_end {
        let joined: Vec<&Sample> = clock
            .day_keys(window.start, archive_end)
            .iter()
            .filter_map(|key| cache.peek(key))
            .flat_map(|entry| entry.records.iter())
            .collect();
        merged = cut_records(&joined, window.start, window.end)
            .iter()
            .map(|s| (*s).clone())
            .collect();
    }

    let active_from = merged.last().map_or(window.start, |s| s.minute() + 1);
    merged.extend_from_slice(cut_records(buffer.as_slice(), active_from, window.end));

    if merged.is_empty() {
        if let Some(latest) = buffer.latest() {
            merged.push(latest.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::minutes;
    use crate::core::constants::ONEDAY_M;

    const JST: i64 = 9 * 60;

    fn mins(samples: &[Sample]) -> Vec<i64> {
        samples.iter().map(Sample::minute).collect()
    }

    fn day_samples(clock: &DayClock, key: &str, offsets: std::ops::RangeInclusive<i64>) -> Vec<Sample> {
        let base = clock.day_start_of_key(key).unwrap();
        minutes(base + offsets.start()..=base + offsets.end())
    }

    #[test]
    fn test_cut_records_bounds() {
        let recs = minutes(10..=20);
        assert_eq!(mins(cut_records(&recs, 10, 21)), (10..=20).collect::<Vec<_>>());
        assert_eq!(mins(cut_records(&recs, 12, 15)), vec![12, 13, 14]);
        assert!(cut_records(&recs, 21, 30).is_empty());
        assert!(cut_records(&recs, 0, 10).is_empty());
        assert!(cut_records(&recs, 15, 15).is_empty());
        let empty: Vec<Sample> = Vec::new();
        assert!(cut_records(&empty, 0, 10).is_empty());
    }

    #[test]
    fn test_scenario_full_archive_day() {
        let clock = DayClock::new(JST);
        let mut cache = ArchiveCache::new(20);
        cache.put("20240101", day_samples(&clock, "20240101", 0..=4));
        let buffer = ActiveBuffer::new(100);

        let start = clock.day_start_of_key("20240101").unwrap();
        let out = composite(&buffer, &cache, &clock, &ViewOptions::fixed(start, ONEDAY_M));
        assert_eq!(mins(&out), (start..=start + 4).collect::<Vec<_>>());
    }

    #[test]
    fn test_scenario_latest_mode_range() {
        let clock = DayClock::new(JST);
        let cache = ArchiveCache::new(20);
        let mut buffer = ActiveBuffer::new(100);
        buffer.append(minutes(100..=110));

        let out = composite(&buffer, &cache, &clock, &ViewOptions::latest(5));
        assert_eq!(mins(&out), vec![106, 107, 108, 109, 110]);
    }

    #[test]
    fn test_latest_mode_empty_buffer() {
        let clock = DayClock::new(0);
        let mut cache = ArchiveCache::new(20);
        cache.put("19700101", minutes(0..=10));
        let buffer = ActiveBuffer::new(100);
        assert!(composite(&buffer, &cache, &clock, &ViewOptions::latest(60)).is_empty());
    }

    #[test]
    fn test_boundary_law_across_days() {
        let clock = DayClock::new(JST);
        let mut cache = ArchiveCache::new(20);
        for key in ["20240101", "20240102", "20240103"] {
            cache.put(key, day_samples(&clock, key, 0..=ONEDAY_M - 1));
        }
        let buffer = ActiveBuffer::new(100);
        let day1 = clock.day_start_of_key("20240101").unwrap();

        for (start, len) in [
            (day1, ONEDAY_M),
            (day1 + 700, ONEDAY_M),
            (day1 + ONEDAY_M - 1, 2),
            (day1 + 5, 3 * ONEDAY_M),
            (day1 - 30, 60),
        ] {
            let out = composite(&buffer, &cache, &clock, &ViewOptions::fixed(start, len));
            let got = mins(&out);
            let expected: Vec<i64> = (start.max(day1)..(start + len).min(day1 + 3 * ONEDAY_M)).collect();
            assert_eq!(got, expected, "window starting at {start} len {len}");
        }
    }

    #[test]
    fn test_missing_day_is_a_gap() {
        let clock = DayClock::new(0);
        let mut cache = ArchiveCache::new(20);
        cache.put("19700101", minutes(0..=ONEDAY_M - 1));
        cache.put("19700103", minutes(2 * ONEDAY_M..=3 * ONEDAY_M - 1));
        let buffer = ActiveBuffer::new(100);

        let out = composite(&buffer, &cache, &clock, &ViewOptions::fixed(ONEDAY_M - 2, ONEDAY_M + 4));
        assert_eq!(
            mins(&out),
            vec![ONEDAY_M - 2, ONEDAY_M - 1, 2 * ONEDAY_M, 2 * ONEDAY_M + 1]
        );
    }

    #[test]
    fn test_seam_has_no_duplicates() {
        let clock = DayClock::new(0);
        let mut cache = ArchiveCache::new(20);
        // archive overlaps the live buffer for minutes 50..=100
        cache.put("19700101", minutes(0..=100));
        let mut buffer = ActiveBuffer::new(1000);
        buffer.append(minutes(50..=150));

        let out = composite(&buffer, &cache, &clock, &ViewOptions::fixed(0, 200));
        assert_eq!(mins(&out), (0..=150).collect::<Vec<_>>());
    }

    #[test]
    fn test_seam_handoff_mid_window() {
        let clock = DayClock::new(0);
        let mut cache = ArchiveCache::new(20);
        cache.put("19700101", minutes(0..=59));
        let mut buffer = ActiveBuffer::new(1000);
        buffer.append(minutes(60..=120));

        let out = composite(&buffer, &cache, &clock, &ViewOptions::latest(100));
        assert_eq!(mins(&out), (21..=120).collect::<Vec<_>>());
    }

    #[test]
    fn test_future_window_falls_back_to_latest() {
        let clock = DayClock::new(0);
        let cache = ArchiveCache::new(20);
        let mut buffer = ActiveBuffer::new(100);
        buffer.append(minutes(100..=110));

        let out = composite(&buffer, &cache, &clock, &ViewOptions::fixed(5000, 60));
        assert_eq!(mins(&out), vec![110]);
    }

    #[test]
    fn test_overflowing_window_is_unresolved() {
        let clock = DayClock::new(JST);
        let cache = ArchiveCache::new(20);
        let mut buffer = ActiveBuffer::new(100);

        let view = ViewOptions::fixed(i64::MAX - 10, 100);
        assert_eq!(Window::resolve(&buffer, &view), None);
        assert!(composite(&buffer, &cache, &clock, &view).is_empty());

        buffer.append(minutes(100..=110));
        let view = ViewOptions::latest(i64::MAX);
        assert_eq!(Window::resolve(&buffer, &view), Some(Window { start: 111 - i64::MAX, end: 111 }));
        let view = ViewOptions::fixed(i64::MIN, -1);
        assert_eq!(Window::resolve(&buffer, &view), None);
    }

    #[test]
    fn test_clamped_range() {
        let view = ViewOptions::latest(1_000_000_000).clamped(ONEDAY_M);
        assert_eq!(view.range_minutes, ONEDAY_M);
        assert_eq!(ViewOptions::fixed(7, 0).clamped(ONEDAY_M), ViewOptions::fixed(7, 1));
        assert_eq!(ViewOptions::latest(60).clamped(ONEDAY_M), ViewOptions::latest(60));
    }

    #[test]
    fn test_idempotent() {
        let clock = DayClock::new(JST);
        let mut cache = ArchiveCache::new(20);
        cache.put("20240101", day_samples(&clock, "20240101", 0..=300));
        let mut buffer = ActiveBuffer::new(1000);
        let base = clock.day_start_of_key("20240101").unwrap();
        buffer.append(minutes(base + 301..=base + 400));

        let view = ViewOptions::fixed(base + 250, 100);
        let a = composite(&buffer, &cache, &clock, &view);
        let b = composite(&buffer, &cache, &clock, &view);
        assert_eq!(a, b);
        assert_eq!(mins(&a), (base + 250..base + 350).collect::<Vec<_>>());
    }
}
