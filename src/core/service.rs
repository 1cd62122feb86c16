// Event loop driving the engine: polling, archive list, archive drain, commands

use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::aggregate::AggregateOptions;
use crate::core::composite::ViewOptions;
use crate::core::engine::{Engine, Snapshot};
use crate::core::scheduler::DrainOutcome;
use crate::core::transport::ArchiveSource;

#[derive(Debug, Clone)]
pub enum Command {
    SetView(ViewOptions),
    SetOptions(AggregateOptions),
}

/// Latest committed snapshot; `None` until the first one is computed.
pub type SnapshotSender = watch::Sender<Option<Arc<Snapshot>>>;
pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    watch::channel(None)
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

fn publish(engine: &mut Engine, snapshots: &SnapshotSender) {
    let snapshot = engine.snapshot();
    debug!(
        "Snapshot {}: {} samples, {} days cached, {} queued",
        snapshot.revision,
        snapshot.sample_count,
        snapshot.cached_days.len(),
        snapshot.queued_days
    );
    snapshots.send_replace(Some(Arc::new(snapshot)));
}

fn drain_now(engine: &Engine, current: Option<Instant>) -> Option<Instant> {
    if !engine.has_pending_archives() {
        None
    } else {
        current.or_else(|| Some(Instant::now()))
    }
}

/// Run until the command channel closes. All state mutation happens on this
/// task; every mutation is followed by a fresh snapshot on `snapshots`.
pub async fn run<S: ArchiveSource>(
    mut engine: Engine,
    source: S,
    mut commands: mpsc::Receiver<Command>,
    snapshots: SnapshotSender,
) {
    let config = engine.config().clone();

    let mut poll = interval(config.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut list_at = Some(Instant::now() + config.list_first_delay());
    let mut drain_at: Option<Instant> = None;

    info!("Engine loop started");

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match engine.poll(&source, now_secs()).await {
                    Ok(0) => debug!("Poll: no new data"),
                    Ok(n) => {
                        info!("Poll: {} new samples", n);
                        drain_at = drain_now(&engine, drain_at);
                        publish(&mut engine, &snapshots);
                    }
                    Err(e) => warn!("Poll failed: {}", e),
                }
            }

            _ = wait_for(list_at) => {
                match engine.load_known_days(&source, now_secs()).await {
                    Ok(queued) => {
                        list_at = None;
                        debug!("Archive queue after list: {} days", queued);
                        drain_at = drain_now(&engine, None);
                    }
                    Err(e) => {
                        warn!("Archive list fetch failed: {}", e);
                        list_at = Some(Instant::now() + config.list_retry());
                    }
                }
            }

            _ = wait_for(drain_at) => {
                match engine.drain_archives(&source).await {
                    DrainOutcome::Completed => {
                        drain_at = None;
                        publish(&mut engine, &snapshots);
                    }
                    DrainOutcome::Retry => {
                        drain_at = Some(Instant::now() + config.archive_retry());
                    }
                }
            }

            command = commands.recv() => match command {
                Some(Command::SetView(view)) => {
                    engine.set_view(view);
                    // a new queue supersedes any pending retry
                    drain_at = drain_now(&engine, None);
                    publish(&mut engine, &snapshots);
                }
                Some(Command::SetOptions(options)) => {
                    engine.set_options(options);
                    publish(&mut engine, &snapshots);
                }
                None => {
                    info!("Command channel closed, engine loop stopping");
                    break;
                }
            },
        }
    }
}
