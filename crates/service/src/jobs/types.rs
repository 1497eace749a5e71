//! Background job types and definitions

use chrono::{DateTime, Utc};
use insights_types::days_before;
use thiserror::Error;

/// Errors that can occur during job processing
#[derive(Debug, Error)]
pub enum JobError {
	#[error("Job processing failed: {message}")]
	ProcessingFailed { message: String },

	#[error("Storage error: {0}")]
	Storage(String),

	#[error("Job panicked: {job}")]
	Panicked { job: String },
}

/// Result type for job operations
pub type JobResult<T = ()> = Result<T, JobError>;

/// `now` minus `days`, failing the job when the cutoff is not representable
pub(crate) fn cutoff_before(now: DateTime<Utc>, days: i64, what: &str) -> JobResult<DateTime<Utc>> {
	days_before(now, days).ok_or_else(|| JobError::ProcessingFailed {
		message: format!("{} of {} days is out of range", what, days),
	})
}

/// The background jobs driven by repeating timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
	/// Flush buffered execution events to storage (every instance)
	Collection,
	/// Roll fine-grained periods into coarser ones (leader only)
	Compaction,
	/// Delete aged insights (leader only)
	Pruning,
}

impl JobKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobKind::Collection => "insights-collection",
			JobKind::Compaction => "insights-compaction",
			JobKind::Pruning => "insights-pruning",
		}
	}

	/// Get a human-readable description of the job
	pub fn description(&self) -> &'static str {
		match self {
			JobKind::Collection => "Flush buffered execution insights",
			JobKind::Compaction => "Compact insights into coarser periods",
			JobKind::Pruning => "Prune insights past their retention",
		}
	}
}

impl std::fmt::Display for JobKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}
