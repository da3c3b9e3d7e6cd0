pub mod conflict;
pub mod engine;
pub mod exclude;
pub mod hasher;
pub mod manager;
pub mod outcome;
pub mod snapshot;

pub use conflict::{conflict_name, ConflictResolver};
pub use engine::SyncEngine;
pub use exclude::{is_excluded, ExclusionMatcher};
pub use hasher::{content_hash_bytes, content_hash_file, ContentHasher};
pub use manager::{HistorySink, ManagerReport, SyncManager};
pub use outcome::{LogEvent, LogKind, LogSink, NullSink, SyncOutcome};
pub use snapshot::{FileSnapshot, JsonSnapshotStore, Snapshot, SnapshotStore, SqliteSnapshotStore};
