// Archive fetch scheduler: which days to fetch, in what order, and when to stop

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

use crate::core::buffer::ActiveBuffer;
use crate::core::cache::ArchiveCache;
use crate::core::calendar::DayClock;
use crate::core::composite::Window;
use crate::core::transport::ArchiveSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchState {
    Idle,
    Queued,
    Fetching,
    /// A batch ended with keys left over; waiting for the retry timer.
    Backoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue is empty; the view should be recomputed.
    Completed,
    /// Keys remain; drain again after the retry backoff.
    Retry,
}

#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    pub fetched: Vec<String>,
    pub touched: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Option<String>,
}

#[derive(Debug)]
pub struct ArchiveScheduler {
    queue: VecDeque<String>,
    known_days: HashSet<String>,
    batch_limit: usize,
    state: FetchState,
}

impl ArchiveScheduler {
    pub fn new(batch_limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            known_days: HashSet::new(),
            batch_limit: batch_limit.max(1),
            state: FetchState::Idle,
        }
    }

    /// Replace the queue with the local days of `window` that lie strictly
    /// before the buffer's first minute.
    pub fn build_queue(&mut self, window: Option<Window>, buffer: &ActiveBuffer, clock: &DayClock) -> usize {
        self.queue.clear();
        if let Some(window) = window {
            let end = buffer
                .earliest_minute()
                .map_or(window.end, |first| window.end.min(first));
            self.queue.extend(clock.day_keys(window.start, end));
        }

        self.state = if self.queue.is_empty() {
            FetchState::Idle
        } else {
            FetchState::Queued
        };
        debug!("Archive queue rebuilt: {:?}", self.queue);
        self.queue.len()
    }

    /// Process at most one batch. Stops at the first failed fetch so the
    /// remainder is retried in order.
    pub async fn drain<S: ArchiveSource>(
        &mut self,
        cache: &mut ArchiveCache,
        source: &S,
    ) -> (DrainOutcome, DrainReport) {
        let mut report = DrainReport::default();
        self.state = FetchState::Fetching;

        for _ in 0..self.batch_limit {
            let Some(key) = self.queue.front().cloned() else {
                break;
            };

            if cache.get(&key).is_some() {
                debug!("Archive {} already cached", key);
                self.queue.pop_front();
                report.touched.push(key);
            } else if !self.known_days.contains(&key) {
                debug!("Archive {} not listed, skipping", key);
                self.queue.pop_front();
                report.skipped.push(key);
            } else {
                match source.fetch_day_archive(&key).await {
                    Ok(records) => {
                        info!("Fetched archive {}: {} samples", key, records.len());
                        cache.put(&key, records);
                        self.queue.pop_front();
                        report.fetched.push(key);
                    }
                    Err(e) => {
                        warn!("Archive fetch failed for {}: {}", key, e);
                        report.failed = Some(key);
                        break;
                    }
                }
            }
        }

        if self.queue.is_empty() {
            self.state = FetchState::Idle;
            (DrainOutcome::Completed, report)
        } else {
            self.state = FetchState::Backoff;
            (DrainOutcome::Retry, report)
        }
    }

    /// Replace the known-days set; `today` is always considered known since
    /// the live buffer can supply it.
    pub fn set_known_days<I>(&mut self, days: I, today: String)
    where
        I: IntoIterator<Item = String>,
    {
        self.known_days = days.into_iter().collect();
        self.known_days.insert(today);
    }

    pub fn mark_known(&mut self, day_key: String) {
        self.known_days.insert(day_key);
    }

    pub fn is_known(&self, day_key: &str) -> bool {
        self.known_days.contains(day_key)
    }

    pub fn queue(&self) -> impl Iterator<Item = &String> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> FetchState {
        self.state
    }
}
