//! Insights service
//!
//! Read-side aggregation over the metrics repository: the current/previous
//! window summary, the per-workflow ranking, the time series and the
//! license-gated date-range resolution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use insights_types::{
	days_before, DateRangeDescriptor, DateRangeKey, InsightsByTime, InsightsByTimeValues, InsightsByWorkflow,
	InsightsError, InsightsQueryStorageTrait, InsightsResult, InsightsSummary, LicensePolicy,
	MetricType, MetricUnit, PeriodTypeAggregate, PeriodUnit, PeriodWindow, ResolvedDateRange,
	SummaryMetric, TimeBucketRow, WorkflowInsightsQuery, WorkflowSortBy,
};
use tracing::debug;

/// Largest page a caller may request from the workflow ranking
pub const MAX_PAGE_SIZE: usize = 100;

/// Trait for the insights read operations
#[async_trait]
pub trait InsightsServiceTrait: Send + Sync {
	/// Compare the last `period_length_in_days` days against the window before them
	async fn compute_summary(&self, period_length_in_days: u32) -> InsightsResult<InsightsSummary>;

	/// Per-workflow totals, sorted by `sort_by` (`<field>:<asc|desc>`) and paged
	async fn list_by_workflow(
		&self,
		max_age_in_days: u32,
		skip: usize,
		take: usize,
		sort_by: &str,
	) -> InsightsResult<InsightsByWorkflow>;

	/// One entry per `period_unit` bucket inside the last `max_age_in_days` days
	async fn list_by_time(
		&self,
		max_age_in_days: u32,
		period_unit: PeriodUnit,
	) -> InsightsResult<Vec<InsightsByTime>>;

	/// Every known date range with its license flag
	fn available_date_ranges(&self) -> Vec<DateRangeDescriptor>;

	/// Resolve a date range the current license allows querying
	fn resolve_date_range(&self, key: DateRangeKey) -> InsightsResult<ResolvedDateRange>;

	/// Parse then resolve a textual date range key such as `month` or `30d`
	fn resolve_date_range_str(&self, key: &str) -> InsightsResult<ResolvedDateRange> {
		self.resolve_date_range(key.parse()?)
	}
}

#[derive(Clone)]
pub struct InsightsService {
	storage: Arc<dyn InsightsQueryStorageTrait>,
	license: Arc<dyn LicensePolicy>,
}

impl InsightsService {
	pub fn new(storage: Arc<dyn InsightsQueryStorageTrait>, license: Arc<dyn LicensePolicy>) -> Self {
		Self { storage, license }
	}
}

#[async_trait]
impl InsightsServiceTrait for InsightsService {
	async fn compute_summary(&self, period_length_in_days: u32) -> InsightsResult<InsightsSummary> {
		// the previous window reaches back twice the period length
		ensure_day_window("period length", period_length_in_days, 2)?;

		let rows = self
			.storage
			.previous_and_current_period_type_aggregates(period_length_in_days)
			.await?;
		debug!(
			"Summarizing {} aggregate rows over {} day windows",
			rows.len(),
			period_length_in_days
		);

		Ok(summarize(&rows))
	}

	async fn list_by_workflow(
		&self,
		max_age_in_days: u32,
		skip: usize,
		take: usize,
		sort_by: &str,
	) -> InsightsResult<InsightsByWorkflow> {
		ensure_day_window("max age", max_age_in_days, 1)?;
		if take == 0 || take > MAX_PAGE_SIZE {
			return Err(InsightsError::invalid_argument(format!(
				"take must be between 1 and {}, got {}",
				MAX_PAGE_SIZE, take
			)));
		}
		let sort_by: WorkflowSortBy = sort_by.parse()?;

		let query = WorkflowInsightsQuery {
			max_age_in_days,
			skip,
			take,
			sort_by,
		};
		let page = self.storage.insights_by_workflow(&query).await?;
		debug!(
			"Ranked {} workflows by {}, returning {}",
			page.count,
			query.sort_by,
			page.rows.len()
		);

		Ok(page.into())
	}

	async fn list_by_time(
		&self,
		max_age_in_days: u32,
		period_unit: PeriodUnit,
	) -> InsightsResult<Vec<InsightsByTime>> {
		ensure_day_window("max age", max_age_in_days, 1)?;

		let rows = self
			.storage
			.insights_by_time(max_age_in_days, period_unit)
			.await?;
		Ok(rows.into_iter().map(time_bucket_entry).collect())
	}

	fn available_date_ranges(&self) -> Vec<DateRangeDescriptor> {
		self.license.available_date_ranges()
	}

	fn resolve_date_range(&self, key: DateRangeKey) -> InsightsResult<ResolvedDateRange> {
		let descriptor = self
			.license
			.available_date_ranges()
			.into_iter()
			.find(|range| range.key == key)
			.ok_or_else(|| InsightsError::NotFound {
				key: key.to_string(),
			})?;

		if !descriptor.licensed {
			return Err(InsightsError::LicenseExceeded {
				key: key.to_string(),
			});
		}

		Ok(descriptor.into())
	}
}

/// Reject zero-day windows and windows reaching before the earliest representable date
fn ensure_day_window(name: &str, days: u32, windows: i64) -> InsightsResult<()> {
	if days == 0 {
		return Err(InsightsError::invalid_argument(format!(
			"{} must be at least one day",
			name
		)));
	}
	if days_before(Utc::now(), i64::from(days) * windows).is_none() {
		return Err(InsightsError::invalid_argument(format!(
			"{} of {} days is out of range",
			name, days
		)));
	}
	Ok(())
}

/// Round half up to `decimals` places. Only meaningful for non-negative
/// values: negatives round toward positive infinity on ties.
pub fn round_to(value: f64, decimals: i32) -> f64 {
	let factor = 10f64.powi(decimals);
	(value * factor + 0.5).floor() / factor
}

#[derive(Debug, Default, Clone, Copy)]
struct WindowTotals {
	total: f64,
	failed: f64,
	failure_rate: f64,
	average_run_time: f64,
	time_saved: f64,
}

impl WindowTotals {
	fn from_values(values: &HashMap<MetricType, f64>) -> Self {
		let value = |metric: MetricType| values.get(&metric).copied().unwrap_or(0.0);
		let succeeded = value(MetricType::Success);
		let failed = value(MetricType::Failure);
		let total = succeeded + failed;

		let (failure_rate, average_run_time) = if total > 0.0 {
			(
				round_to(failed / total, 3),
				round_to(value(MetricType::RuntimeMs) / total, 2),
			)
		} else {
			(0.0, 0.0)
		};

		Self {
			total,
			failed,
			failure_rate,
			average_run_time,
			time_saved: value(MetricType::TimeSavedMin),
		}
	}
}

/// Build the summary from repository rows. Missing rows and `None` values count as zero.
pub fn summarize(rows: &[PeriodTypeAggregate]) -> InsightsSummary {
	let mut by_period: HashMap<PeriodWindow, HashMap<MetricType, f64>> = HashMap::new();
	for row in rows {
		*by_period
			.entry(row.period)
			.or_default()
			.entry(row.metric_type)
			.or_insert(0.0) += row.total_value.unwrap_or(0.0);
	}

	let window = |period: PeriodWindow| {
		by_period
			.get(&period)
			.map(WindowTotals::from_values)
			.unwrap_or_default()
	};
	let current = window(PeriodWindow::Current);
	let previous = window(PeriodWindow::Previous);
	let has_baseline = previous.total != 0.0;

	let metric = |pick: fn(&WindowTotals) -> f64, unit: MetricUnit| SummaryMetric {
		value: pick(&current),
		unit,
		deviation: has_baseline.then(|| pick(&current) - pick(&previous)),
	};

	InsightsSummary {
		average_run_time: metric(|w| w.average_run_time, MetricUnit::Millisecond),
		failed: metric(|w| w.failed, MetricUnit::Count),
		failure_rate: metric(|w| w.failure_rate, MetricUnit::Ratio),
		time_saved: metric(|w| w.time_saved, MetricUnit::Minute),
		total: metric(|w| w.total, MetricUnit::Count),
	}
}

/// Empty buckets divide by zero and yield `NaN` rates; they are not coerced.
fn time_bucket_entry(row: TimeBucketRow) -> InsightsByTime {
	let total = row.succeeded + row.failed;
	let divisor = total as f64;

	InsightsByTime {
		date: row.period_start,
		values: InsightsByTimeValues {
			total,
			succeeded: row.succeeded,
			failed: row.failed,
			failure_rate: row.failed as f64 / divisor,
			average_run_time: row.run_time / divisor,
			time_saved: row.time_saved,
		},
	}
}
