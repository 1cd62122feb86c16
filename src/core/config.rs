// Engine configuration supplied by the host

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::aggregate::AggregateOptions;
use crate::core::calendar::DayClock;
use crate::core::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_secs: u64,
    /// Maximum samples kept in the active buffer.
    pub hold_count: usize,
    pub cache_capacity: usize,
    pub fetch_batch_limit: usize,
    pub list_first_delay_secs: u64,
    pub list_retry_secs: u64,
    pub archive_retry_secs: u64,
    /// Longer view ranges are clamped to this many minutes.
    pub max_range_minutes: i64,
    /// Fixed local offset used for day keys. `None` takes the host offset at startup.
    pub utc_offset_minutes: Option<i64>,
    pub aggregate: AggregateOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: POLL_INTERVAL_SECS,
            hold_count: DATA_HOLD_COUNT,
            cache_capacity: ARC_CACHE_SIZE,
            fetch_batch_limit: ARC_FETCH_BATCH,
            list_first_delay_secs: LIST_FETCH_FIRST_SECS,
            list_retry_secs: LIST_FETCH_RETRY_SECS,
            archive_retry_secs: ARC_FETCH_RETRY_SECS,
            max_range_minutes: MAX_RANGE_M,
            utc_offset_minutes: None,
            aggregate: AggregateOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn list_first_delay(&self) -> Duration {
        Duration::from_secs(self.list_first_delay_secs)
    }

    pub fn list_retry(&self) -> Duration {
        Duration::from_secs(self.list_retry_secs)
    }

    pub fn archive_retry(&self) -> Duration {
        Duration::from_secs(self.archive_retry_secs)
    }

    /// Seconds of history requested by the first poll.
    pub fn hold_secs(&self) -> i64 {
        self.hold_count as i64 * 60
    }

    pub fn day_clock(&self) -> DayClock {
        self.utc_offset_minutes
            .map(DayClock::new)
            .unwrap_or_else(DayClock::local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.hold_count, 7 * 24 * 60);
        assert_eq!(config.cache_capacity, 20);
        assert_eq!(config.fetch_batch_limit, 9);
        assert_eq!(config.archive_retry(), Duration::from_secs(30));
        assert_eq!(config.max_range_minutes, 366 * 24 * 60);
        assert!(config.aggregate.fix_top_generation);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"cache_capacity": 5, "utc_offset_minutes": 540}"#).unwrap();
        assert_eq!(config.cache_capacity, 5);
        assert_eq!(config.fetch_batch_limit, 9);
        assert_eq!(config.day_clock().utc_offset_minutes(), 540);
    }
}
