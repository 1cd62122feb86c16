use envlog::{Command, SnapshotReceiver};
use tokio::sync::mpsc;

/// Handles shared by every route: the engine's published snapshot and its
/// command queue. The engine state itself stays on the engine task.
#[derive(Clone)]
pub struct AppState {
    pub snapshots: SnapshotReceiver,
    pub commands: mpsc::Sender<Command>,
}

impl AppState {
    pub fn new(snapshots: SnapshotReceiver, commands: mpsc::Sender<Command>) -> Self {
        Self {
            snapshots,
            commands,
        }
    }
}
