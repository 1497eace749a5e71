//! Summary shapes for the current/previous window comparison

use serde::{Deserialize, Serialize};

use super::{MetricType, PeriodWindow};

/// Aggregated value of one metric type inside one comparison window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTypeAggregate {
	pub period: PeriodWindow,
	#[serde(rename = "type")]
	pub metric_type: MetricType,
	/// `None` means the store has no data for this period and type
	pub total_value: Option<f64>,
}

impl PeriodTypeAggregate {
	pub fn new(period: PeriodWindow, metric_type: MetricType, total_value: Option<f64>) -> Self {
		Self {
			period,
			metric_type,
			total_value,
		}
	}
}

/// Display unit of a summary metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
	Millisecond,
	Count,
	Ratio,
	Minute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetric {
	pub value: f64,
	pub unit: MetricUnit,
	/// Raw `current - previous`; `None` when the previous window had no executions
	pub deviation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsSummary {
	pub average_run_time: SummaryMetric,
	pub failed: SummaryMetric,
	pub failure_rate: SummaryMetric,
	pub time_saved: SummaryMetric,
	pub total: SummaryMetric,
}

impl InsightsSummary {
	/// All metrics in serialization order
	pub fn metrics(&self) -> [&SummaryMetric; 5] {
		[
			&self.average_run_time,
			&self.failed,
			&self.failure_rate,
			&self.time_saved,
			&self.total,
		]
	}
}
