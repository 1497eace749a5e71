//! Time-series bucket shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One period bucket as aggregated by the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucketRow {
	pub period_start: DateTime<Utc>,
	pub succeeded: u64,
	pub failed: u64,
	pub run_time: f64,
	pub time_saved: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsByTimeValues {
	pub total: u64,
	pub succeeded: u64,
	pub failed: u64,
	/// `NaN` for empty buckets
	pub failure_rate: f64,
	/// `NaN` for empty buckets
	pub average_run_time: f64,
	pub time_saved: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsByTime {
	pub date: DateTime<Utc>,
	pub values: InsightsByTimeValues,
}
