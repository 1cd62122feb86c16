// Engine: owns the buffer, cache and scheduler and produces view snapshots

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::aggregate::{aggregate, AggregateOptions, Aggregation};
use crate::core::buffer::ActiveBuffer;
use crate::core::cache::ArchiveCache;
use crate::core::calendar::DayClock;
use crate::core::composite::{composite, ViewOptions, Window};
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::format::Sample;
use crate::core::scheduler::{ArchiveScheduler, DrainOutcome, FetchState};
use crate::core::transport::ArchiveSource;

/// Read-only view handed to the presentation side; recomputed wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub revision: u64,
    pub view: ViewOptions,
    pub window: Option<Window>,
    pub sample_count: usize,
    pub buffered: usize,
    pub cached_days: Vec<String>,
    pub queued_days: usize,
    pub fetch_state: FetchState,
    pub aggregation: Option<Aggregation>,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    clock: DayClock,
    buffer: ActiveBuffer,
    cache: ArchiveCache,
    scheduler: ArchiveScheduler,
    view: ViewOptions,
    options: AggregateOptions,
    revision: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let clock = config.day_clock();
        info!(
            "Engine created: hold {} samples, cache {} days, UTC offset {} min",
            config.hold_count,
            config.cache_capacity,
            clock.utc_offset_minutes()
        );
        Self {
            clock,
            buffer: ActiveBuffer::new(config.hold_count),
            cache: ArchiveCache::new(config.cache_capacity),
            scheduler: ArchiveScheduler::new(config.fetch_batch_limit),
            view: ViewOptions::default(),
            options: config.aggregate.clone(),
            revision: 0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &DayClock {
        &self.clock
    }

    pub fn buffer(&self) -> &ActiveBuffer {
        &self.buffer
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &ArchiveScheduler {
        &self.scheduler
    }

    pub fn view(&self) -> ViewOptions {
        self.view
    }

    /// Diff cursor: the newest buffered timestamp, or one hold period back
    /// from `now_secs` before anything has arrived.
    pub fn poll_since(&self, now_secs: i64) -> i64 {
        self.buffer
            .latest_timestamp()
            .unwrap_or(now_secs - self.config.hold_secs())
    }

    /// Append freshly polled samples. The tail's day becomes known since the
    /// buffer can serve it. The first data into an empty buffer resolves the
    /// latest-mode window, so the fetch queue is rebuilt then.
    pub fn ingest(&mut self, samples: Vec<Sample>) -> usize {
        let was_empty = self.buffer.is_empty();
        let accepted = self.buffer.append(samples);
        if accepted == 0 {
            return 0;
        }

        if let Some(ts) = self.buffer.latest_timestamp() {
            self.scheduler.mark_known(self.clock.day_key_of_timestamp(ts));
        }
        if was_empty {
            self.rebuild_queue();
        }
        accepted
    }

    pub async fn poll<S: ArchiveSource>(&mut self, source: &S, now_secs: i64) -> Result<usize> {
        let since = self.poll_since(now_secs);
        let samples = source.fetch_diff(since).await?;
        let received = samples.len();
        let accepted = self.ingest(samples);
        debug!("Poll since {}: {} received, {} accepted", since, received, accepted);
        Ok(accepted)
    }

    /// Fetch the known-days list and restart archive loading for the
    /// current view.
    pub async fn load_known_days<S: ArchiveSource>(&mut self, source: &S, now_secs: i64) -> Result<usize> {
        let days = source.fetch_known_days().await?;
        info!("Archive list: {} days known", days.len());
        let today = self.clock.day_key_of_timestamp(now_secs);
        self.scheduler.set_known_days(days, today);
        if let Some(ts) = self.buffer.latest_timestamp() {
            self.scheduler.mark_known(self.clock.day_key_of_timestamp(ts));
        }
        Ok(self.rebuild_queue())
    }

    pub fn set_view(&mut self, view: ViewOptions) -> usize {
        let clamped = view.clamped(self.config.max_range_minutes);
        if clamped != view {
            warn!(
                "View range {} min clamped to {} min",
                view.range_minutes, clamped.range_minutes
            );
        }
        let view = clamped;
        info!(
            "View changed: {} min, anchor {:?}",
            view.range_minutes, view.anchor_minute
        );
        self.view = view;
        self.rebuild_queue()
    }

    pub fn set_options(&mut self, options: AggregateOptions) {
        debug!("Aggregate options changed: {:?}", options);
        self.options = options;
    }

    fn rebuild_queue(&mut self) -> usize {
        let window = Window::resolve(&self.buffer, &self.view);
        self.scheduler.build_queue(window, &self.buffer, &self.clock)
    }

    pub fn has_pending_archives(&self) -> bool {
        self.scheduler.queue_len() > 0
    }

    /// Run one scheduler batch against `source`.
    pub async fn drain_archives<S: ArchiveSource>(&mut self, source: &S) -> DrainOutcome {
        let (outcome, report) = self.scheduler.drain(&mut self.cache, source).await;
        match outcome {
            DrainOutcome::Completed => info!(
                "Archive queue drained: {} fetched, {} reused, {} not listed",
                report.fetched.len(),
                report.touched.len(),
                report.skipped.len()
            ),
            DrainOutcome::Retry => warn!(
                "Archive queue paused with {} left (failed: {:?})",
                self.scheduler.queue_len(),
                report.failed
            ),
        }
        outcome
    }

    pub fn window(&self) -> Option<Window> {
        Window::resolve(&self.buffer, &self.view)
    }

    /// Composite the current view and aggregate it.
    pub fn snapshot(&mut self) -> Snapshot {
        let samples = composite(&self.buffer, &self.cache, &self.clock, &self.view);
        let aggregation = aggregate(&samples, &self.options);
        self.revision += 1;

        Snapshot {
            revision: self.revision,
            view: self.view,
            window: self.window(),
            sample_count: samples.len(),
            buffered: self.buffer.len(),
            cached_days: self.cache.days(),
            queued_days: self.scheduler.queue_len(),
            fetch_state: self.scheduler.state(),
            aggregation,
        }
    }
}
