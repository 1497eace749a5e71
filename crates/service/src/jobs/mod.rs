//! Background insights jobs
//!
//! Each job owns a [`RepeatingTimer`] and exposes idempotent start/stop
//! operations. Collection runs on every instance; compaction and pruning are
//! started and stopped by the leadership lifecycle.

pub mod collection;
pub mod compaction;
pub mod pruning;
pub mod timer;
pub mod types;

pub use collection::CollectionJob;
pub use compaction::{CompactionJob, CompactionReport};
pub use pruning::PruningJob;
pub use timer::{RepeatingTimer, TimerTask};
pub use types::{JobError, JobKind, JobResult};
