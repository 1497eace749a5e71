//! Per-workflow ranking shapes and the `field:direction` sort grammar

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::errors::InsightsError;

/// Columns a workflow listing may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowSortField {
	Total,
	Succeeded,
	Failed,
	FailureRate,
	RunTime,
	AverageRunTime,
	TimeSaved,
	WorkflowName,
}

impl WorkflowSortField {
	pub const ALL: [WorkflowSortField; 8] = [
		WorkflowSortField::Total,
		WorkflowSortField::Succeeded,
		WorkflowSortField::Failed,
		WorkflowSortField::FailureRate,
		WorkflowSortField::RunTime,
		WorkflowSortField::AverageRunTime,
		WorkflowSortField::TimeSaved,
		WorkflowSortField::WorkflowName,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			WorkflowSortField::Total => "total",
			WorkflowSortField::Succeeded => "succeeded",
			WorkflowSortField::Failed => "failed",
			WorkflowSortField::FailureRate => "failureRate",
			WorkflowSortField::RunTime => "runTime",
			WorkflowSortField::AverageRunTime => "averageRunTime",
			WorkflowSortField::TimeSaved => "timeSaved",
			WorkflowSortField::WorkflowName => "workflowName",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	Asc,
	Desc,
}

/// Parsed `<field>:<asc|desc>` sort expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkflowSortBy {
	pub field: WorkflowSortField,
	pub direction: SortDirection,
}

impl WorkflowSortBy {
	pub fn new(field: WorkflowSortField, direction: SortDirection) -> Self {
		Self { field, direction }
	}

	/// Order two rows according to this sort expression
	pub fn compare(&self, a: &WorkflowInsightsRow, b: &WorkflowInsightsRow) -> Ordering {
		let ordering = match self.field {
			WorkflowSortField::Total => a.total.cmp(&b.total),
			WorkflowSortField::Succeeded => a.succeeded.cmp(&b.succeeded),
			WorkflowSortField::Failed => a.failed.cmp(&b.failed),
			WorkflowSortField::FailureRate => a.failure_rate.total_cmp(&b.failure_rate),
			WorkflowSortField::RunTime => a.run_time.total_cmp(&b.run_time),
			WorkflowSortField::AverageRunTime => a.average_run_time.total_cmp(&b.average_run_time),
			WorkflowSortField::TimeSaved => a.time_saved.total_cmp(&b.time_saved),
			WorkflowSortField::WorkflowName => a.workflow_name.cmp(&b.workflow_name),
		};

		match self.direction {
			SortDirection::Asc => ordering,
			SortDirection::Desc => ordering.reverse(),
		}
	}
}

impl Default for WorkflowSortBy {
	fn default() -> Self {
		Self::new(WorkflowSortField::Total, SortDirection::Desc)
	}
}

impl FromStr for WorkflowSortBy {
	type Err = InsightsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || {
			InsightsError::invalid_argument(format!(
				"sortBy '{}' must match <field>:<asc|desc>",
				s
			))
		};

		let (field, direction) = s.split_once(':').ok_or_else(invalid)?;
		let field = WorkflowSortField::ALL
			.into_iter()
			.find(|candidate| candidate.as_str() == field)
			.ok_or_else(invalid)?;
		let direction = match direction {
			"asc" => SortDirection::Asc,
			"desc" => SortDirection::Desc,
			_ => return Err(invalid()),
		};

		Ok(Self { field, direction })
	}
}

impl fmt::Display for WorkflowSortBy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let direction = match self.direction {
			SortDirection::Asc => "asc",
			SortDirection::Desc => "desc",
		};
		write!(f, "{}:{}", self.field.as_str(), direction)
	}
}

/// Validated query passed to the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInsightsQuery {
	pub max_age_in_days: u32,
	pub skip: usize,
	pub take: usize,
	pub sort_by: WorkflowSortBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInsightsRow {
	pub workflow_id: String,
	pub workflow_name: String,
	pub project_id: Option<String>,
	pub project_name: Option<String>,
	pub total: u64,
	pub succeeded: u64,
	pub failed: u64,
	pub failure_rate: f64,
	pub run_time: f64,
	pub average_run_time: f64,
	pub time_saved: f64,
}

/// Page of rows as returned by the repository
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowInsightsPage {
	/// Number of workflows matching the query before paging
	pub count: usize,
	pub rows: Vec<WorkflowInsightsRow>,
}

/// Paged envelope returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsByWorkflow {
	pub count: usize,
	pub data: Vec<WorkflowInsightsRow>,
}

impl From<WorkflowInsightsPage> for InsightsByWorkflow {
	fn from(page: WorkflowInsightsPage) -> Self {
		Self {
			count: page.count,
			data: page.rows,
		}
	}
}
