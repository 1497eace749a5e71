//! Execution events buffered by the collection job and the buckets they are rolled into

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::insights::{MetricType, PeriodUnit};

/// Final status of a workflow execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
	Success,
	Failure,
}

/// Identity of the workflow a metric belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRef {
	pub workflow_id: String,
	pub workflow_name: String,
	pub project_id: Option<String>,
	pub project_name: Option<String>,
}

impl WorkflowRef {
	pub fn new(workflow_id: impl Into<String>, workflow_name: impl Into<String>) -> Self {
		Self {
			workflow_id: workflow_id.into(),
			workflow_name: workflow_name.into(),
			project_id: None,
			project_name: None,
		}
	}

	pub fn with_project(
		mut self,
		project_id: impl Into<String>,
		project_name: impl Into<String>,
	) -> Self {
		self.project_id = Some(project_id.into());
		self.project_name = Some(project_name.into());
		self
	}
}

/// A single finished execution, not yet compacted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInsight {
	pub workflow: WorkflowRef,
	pub status: ExecutionStatus,
	pub runtime_ms: u64,
	/// Minutes saved per execution as declared by the workflow, if any
	pub time_saved_min: Option<f64>,
	pub finished_at: DateTime<Utc>,
}

impl RawInsight {
	pub fn success(workflow: WorkflowRef, runtime_ms: u64, finished_at: DateTime<Utc>) -> Self {
		Self {
			workflow,
			status: ExecutionStatus::Success,
			runtime_ms,
			time_saved_min: None,
			finished_at,
		}
	}

	pub fn failure(workflow: WorkflowRef, runtime_ms: u64, finished_at: DateTime<Utc>) -> Self {
		Self {
			workflow,
			status: ExecutionStatus::Failure,
			runtime_ms,
			time_saved_min: None,
			finished_at,
		}
	}

	pub fn with_time_saved(mut self, minutes: f64) -> Self {
		self.time_saved_min = Some(minutes);
		self
	}

	/// Metric rows this execution contributes.
	///
	/// Time saved only counts for successful executions.
	pub fn metric_values(&self) -> Vec<(MetricType, f64)> {
		let mut values = Vec::with_capacity(3);
		match self.status {
			ExecutionStatus::Success => values.push((MetricType::Success, 1.0)),
			ExecutionStatus::Failure => values.push((MetricType::Failure, 1.0)),
		}
		values.push((MetricType::RuntimeMs, self.runtime_ms as f64));
		if let (ExecutionStatus::Success, Some(minutes)) = (self.status, self.time_saved_min) {
			values.push((MetricType::TimeSavedMin, minutes));
		}
		values
	}
}

/// A compacted metric row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsBucket {
	pub workflow: WorkflowRef,
	pub period_unit: PeriodUnit,
	pub period_start: DateTime<Utc>,
	#[serde(rename = "type")]
	pub metric_type: MetricType,
	pub value: f64,
}
