// envlog windowing engine
// Main library entry point

pub mod core;

// Re-export main types
pub use core::aggregate::{aggregate, AggregateOptions, Aggregation};
pub use core::composite::{composite, ViewOptions, Window};
pub use core::config::EngineConfig;
pub use core::data_handle::{handle_ws_stream, Series};
pub use core::engine::{Engine, Snapshot};
pub use core::error::{EnvLogError, Result};
pub use core::format::{DeviceReading, Sample};
pub use core::service::{run, Command, SnapshotReceiver, SnapshotSender};
pub use core::transport::{ArchiveSource, HttpSource, SourceConfig};
