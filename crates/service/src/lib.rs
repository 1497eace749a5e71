//! Insights Service
//!
//! Aggregation engine, license policy, background jobs and the leadership
//! lifecycle that drives them.

pub mod insights;
pub mod jobs;
pub mod leadership;
pub mod license;
pub mod lifecycle;

pub use insights::{round_to, summarize, InsightsService, InsightsServiceTrait, MAX_PAGE_SIZE};
pub use jobs::{
	CollectionJob, CompactionJob, CompactionReport, JobError, JobKind, JobResult, PruningJob,
	RepeatingTimer, TimerTask,
};
pub use leadership::{
	LeadershipEvent, LeadershipEventBus, LeadershipHooks, LeadershipSignal, LeadershipState,
};
pub use license::{TierLicensePolicy, UNLIMITED_HISTORY};
pub use lifecycle::{InsightsLifecycle, LifecycleStatus};
