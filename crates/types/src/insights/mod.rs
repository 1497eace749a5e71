//! Core insights domain model: metric kinds, period buckets and comparison windows

use chrono::{DateTime, Datelike, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod by_time;
pub mod by_workflow;
pub mod errors;
pub mod summary;

pub use by_time::{InsightsByTime, InsightsByTimeValues, TimeBucketRow};
pub use by_workflow::{
	InsightsByWorkflow, SortDirection, WorkflowInsightsPage, WorkflowInsightsQuery,
	WorkflowInsightsRow, WorkflowSortBy, WorkflowSortField,
};
pub use errors::{InsightsError, InsightsErrorKind, InsightsResult};
pub use summary::{InsightsSummary, MetricUnit, PeriodTypeAggregate, SummaryMetric};

/// Kind of value stored in a metric row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
	/// Number of successful executions
	Success,
	/// Number of failed executions
	Failure,
	/// Accumulated execution runtime in milliseconds
	RuntimeMs,
	/// Accumulated time saved in minutes
	TimeSavedMin,
}

impl MetricType {
	pub const ALL: [MetricType; 4] = [
		MetricType::Success,
		MetricType::Failure,
		MetricType::RuntimeMs,
		MetricType::TimeSavedMin,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			MetricType::Success => "success",
			MetricType::Failure => "failure",
			MetricType::RuntimeMs => "runtime_ms",
			MetricType::TimeSavedMin => "time_saved_min",
		}
	}
}

impl fmt::Display for MetricType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Granularity of a stored period bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
	Hour,
	Day,
	Week,
}

impl PeriodUnit {
	pub fn as_str(&self) -> &'static str {
		match self {
			PeriodUnit::Hour => "hour",
			PeriodUnit::Day => "day",
			PeriodUnit::Week => "week",
		}
	}

	/// Length of one bucket of this unit
	pub fn duration(&self) -> Duration {
		match self {
			PeriodUnit::Hour => Duration::hours(1),
			PeriodUnit::Day => Duration::days(1),
			PeriodUnit::Week => Duration::weeks(1),
		}
	}

	/// Start of the bucket containing `timestamp`. Weeks start on Monday.
	pub fn truncate(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
		match self {
			PeriodUnit::Hour => timestamp
				.duration_trunc(Duration::hours(1))
				.unwrap_or(timestamp),
			PeriodUnit::Day => timestamp
				.duration_trunc(Duration::days(1))
				.unwrap_or(timestamp),
			PeriodUnit::Week => {
				let day_start = PeriodUnit::Day.truncate(timestamp);
				let from_monday = day_start.weekday().num_days_from_monday() as i64;
				day_start - Duration::days(from_monday)
			},
		}
	}

	/// The next coarser unit, if any
	pub fn coarser(&self) -> Option<PeriodUnit> {
		match self {
			PeriodUnit::Hour => Some(PeriodUnit::Day),
			PeriodUnit::Day => Some(PeriodUnit::Week),
			PeriodUnit::Week => None,
		}
	}
}

impl fmt::Display for PeriodUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for PeriodUnit {
	type Err = InsightsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"hour" => Ok(PeriodUnit::Hour),
			"day" => Ok(PeriodUnit::Day),
			"week" => Ok(PeriodUnit::Week),
			other => Err(InsightsError::InvalidArgument {
				message: format!("unknown period unit '{}'", other),
			}),
		}
	}
}

/// One of the two adjacent windows compared by the summary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeriodWindow {
	/// The most recent `period_length_in_days` days
	Current,
	/// The equally long window immediately before `Current`
	Previous,
}

impl PeriodWindow {
	/// Classify `timestamp` against windows of `period_length_in_days` ending at `now`
	pub fn classify(
		timestamp: DateTime<Utc>,
		now: DateTime<Utc>,
		period_length_in_days: u32,
	) -> Option<PeriodWindow> {
		let length = i64::from(period_length_in_days);
		let current_start = days_before_or_min(now, length);
		let previous_start = days_before_or_min(current_start, length);

		if timestamp >= current_start && timestamp <= now {
			Some(PeriodWindow::Current)
		} else if timestamp >= previous_start && timestamp < current_start {
			Some(PeriodWindow::Previous)
		} else {
			None
		}
	}
}

/// `now` minus `days`, or `None` when the result falls outside chrono's range
pub fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
	Duration::try_days(days).and_then(|length| now.checked_sub_signed(length))
}

/// Like [`days_before`], saturating at the earliest representable instant
pub fn days_before_or_min(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
	days_before(now, days).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
