//! In-memory storage implementation using DashMap

use crate::traits::{
	MaintenanceStorage, QueryStorage, RawStorage, Storage, StorageError, StorageResult,
	StorageStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use insights_types::{
	days_before_or_min, InsightsBucket, MetricType, PeriodTypeAggregate, PeriodUnit, PeriodWindow, RawInsight,
	TimeBucketRow, WorkflowInsightsPage, WorkflowInsightsQuery, WorkflowInsightsRow, WorkflowRef,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Identity of a compacted bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
	pub workflow_id: String,
	pub period_unit: PeriodUnit,
	pub period_start: DateTime<Utc>,
	pub metric_type: MetricType,
}

/// In-memory storage for raw executions and compacted insight buckets
#[derive(Clone)]
pub struct MemoryStore {
	pub raw: Arc<DashMap<u64, RawInsight>>,
	pub buckets: Arc<DashMap<BucketKey, InsightsBucket>>,
	next_raw_id: Arc<AtomicU64>,
	// Serializes compaction and pruning so each call observes a stable view
	maintenance: Arc<Mutex<()>>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStore {
	/// Create a new memory store instance
	pub fn new() -> Self {
		Self {
			raw: Arc::new(DashMap::new()),
			buckets: Arc::new(DashMap::new()),
			next_raw_id: Arc::new(AtomicU64::new(1)),
			maintenance: Arc::new(Mutex::new(())),
		}
	}

	/// Add `value` to the bucket identified by workflow, unit, start and type
	pub fn upsert_bucket(
		&self,
		workflow: &WorkflowRef,
		period_unit: PeriodUnit,
		period_start: DateTime<Utc>,
		metric_type: MetricType,
		value: f64,
	) {
		let key = BucketKey {
			workflow_id: workflow.workflow_id.clone(),
			period_unit,
			period_start,
			metric_type,
		};
		self.buckets
			.entry(key)
			.and_modify(|bucket| {
				bucket.value += value;
				bucket.workflow = workflow.clone();
			})
			.or_insert_with(|| InsightsBucket {
				workflow: workflow.clone(),
				period_unit,
				period_start,
				metric_type,
				value,
			});
	}

	/// Snapshot of every bucket of the given unit, oldest first
	pub fn buckets_of(&self, period_unit: PeriodUnit) -> Vec<InsightsBucket> {
		let mut buckets: Vec<InsightsBucket> = self
			.buckets
			.iter()
			.filter(|entry| entry.key().period_unit == period_unit)
			.map(|entry| entry.value().clone())
			.collect();
		buckets.sort_by_key(|bucket| bucket.period_start);
		buckets
	}

	fn buckets_since(&self, cutoff: DateTime<Utc>) -> Vec<InsightsBucket> {
		self.buckets
			.iter()
			.filter(|entry| entry.key().period_start >= cutoff)
			.map(|entry| entry.value().clone())
			.collect()
	}
}

fn cutoff_for(max_age_in_days: u32) -> DateTime<Utc> {
	days_before_or_min(Utc::now(), i64::from(max_age_in_days))
}

#[derive(Default)]
struct WorkflowTotals {
	workflow: Option<WorkflowRef>,
	succeeded: f64,
	failed: f64,
	run_time: f64,
	time_saved: f64,
}

impl WorkflowTotals {
	fn add(&mut self, bucket: &InsightsBucket) {
		self.workflow = Some(bucket.workflow.clone());
		match bucket.metric_type {
			MetricType::Success => self.succeeded += bucket.value,
			MetricType::Failure => self.failed += bucket.value,
			MetricType::RuntimeMs => self.run_time += bucket.value,
			MetricType::TimeSavedMin => self.time_saved += bucket.value,
		}
	}

	fn into_row(self) -> Option<WorkflowInsightsRow> {
		let workflow = self.workflow?;
		let succeeded = self.succeeded as u64;
		let failed = self.failed as u64;
		let total = succeeded + failed;
		let (failure_rate, average_run_time) = if total == 0 {
			(0.0, 0.0)
		} else {
			(failed as f64 / total as f64, self.run_time / total as f64)
		};

		Some(WorkflowInsightsRow {
			workflow_id: workflow.workflow_id,
			workflow_name: workflow.workflow_name,
			project_id: workflow.project_id,
			project_name: workflow.project_name,
			total,
			succeeded,
			failed,
			failure_rate,
			run_time: self.run_time,
			average_run_time,
			time_saved: self.time_saved,
		})
	}
}

#[async_trait]
impl RawStorage for MemoryStore {
	async fn insert_raw_events(&self, events: Vec<RawInsight>) -> StorageResult<usize> {
		let count = events.len();
		for event in events {
			let id = self.next_raw_id.fetch_add(1, Ordering::SeqCst);
			self.raw.insert(id, event);
		}
		Ok(count)
	}

	async fn raw_event_count(&self) -> StorageResult<usize> {
		Ok(self.raw.len())
	}
}

#[async_trait]
impl QueryStorage for MemoryStore {
	async fn previous_and_current_period_type_aggregates(
		&self,
		period_length_in_days: u32,
	) -> StorageResult<Vec<PeriodTypeAggregate>> {
		let now = Utc::now();
		let mut totals: HashMap<(PeriodWindow, MetricType), f64> = HashMap::new();

		for entry in self.buckets.iter() {
			let bucket = entry.value();
			if let Some(window) =
				PeriodWindow::classify(bucket.period_start, now, period_length_in_days)
			{
				*totals.entry((window, bucket.metric_type)).or_insert(0.0) += bucket.value;
			}
		}

		Ok(totals
			.into_iter()
			.map(|((period, metric_type), value)| {
				PeriodTypeAggregate::new(period, metric_type, Some(value))
			})
			.collect())
	}

	async fn insights_by_workflow(
		&self,
		query: &WorkflowInsightsQuery,
	) -> StorageResult<WorkflowInsightsPage> {
		let mut per_workflow: HashMap<String, WorkflowTotals> = HashMap::new();
		for bucket in self.buckets_since(cutoff_for(query.max_age_in_days)) {
			per_workflow
				.entry(bucket.workflow.workflow_id.clone())
				.or_default()
				.add(&bucket);
		}

		let mut rows: Vec<WorkflowInsightsRow> = per_workflow
			.into_values()
			.filter_map(WorkflowTotals::into_row)
			.collect();
		rows.sort_by(|a, b| {
			query
				.sort_by
				.compare(a, b)
				.then_with(|| a.workflow_id.cmp(&b.workflow_id))
		});

		let count = rows.len();
		let rows = rows.into_iter().skip(query.skip).take(query.take).collect();

		Ok(WorkflowInsightsPage { count, rows })
	}

	async fn insights_by_time(
		&self,
		max_age_in_days: u32,
		period_unit: PeriodUnit,
	) -> StorageResult<Vec<TimeBucketRow>> {
		let mut per_period: BTreeMap<DateTime<Utc>, TimeBucketRow> = BTreeMap::new();

		for bucket in self.buckets_since(cutoff_for(max_age_in_days)) {
			let period_start = period_unit.truncate(bucket.period_start);
			let row = per_period.entry(period_start).or_insert_with(|| TimeBucketRow {
				period_start,
				succeeded: 0,
				failed: 0,
				run_time: 0.0,
				time_saved: 0.0,
			});
			match bucket.metric_type {
				MetricType::Success => row.succeeded += bucket.value as u64,
				MetricType::Failure => row.failed += bucket.value as u64,
				MetricType::RuntimeMs => row.run_time += bucket.value,
				MetricType::TimeSavedMin => row.time_saved += bucket.value,
			}
		}

		Ok(per_period.into_values().collect())
	}
}

#[async_trait]
impl MaintenanceStorage for MemoryStore {
	async fn compact_raw_to_hour(&self, batch_size: usize) -> StorageResult<usize> {
		let _guard = self.maintenance.lock().await;

		let mut ids: Vec<u64> = self.raw.iter().map(|entry| *entry.key()).collect();
		ids.sort_unstable();

		let mut compacted = 0;
		for id in ids.into_iter().take(batch_size) {
			let Some((_, event)) = self.raw.remove(&id) else {
				continue;
			};
			let period_start = PeriodUnit::Hour.truncate(event.finished_at);
			for (metric_type, value) in event.metric_values() {
				self.upsert_bucket(
					&event.workflow,
					PeriodUnit::Hour,
					period_start,
					metric_type,
					value,
				);
			}
			compacted += 1;
		}

		if compacted > 0 {
			debug!("Compacted {} raw executions into hourly buckets", compacted);
		}
		Ok(compacted)
	}

	async fn compact_period(
		&self,
		from: PeriodUnit,
		older_than: DateTime<Utc>,
		batch_size: usize,
	) -> StorageResult<usize> {
		let to = from.coarser().ok_or_else(|| StorageError::InvalidQuery {
			message: format!("'{}' buckets cannot be compacted any further", from),
		})?;
		let _guard = self.maintenance.lock().await;

		let mut keys: Vec<BucketKey> = self
			.buckets
			.iter()
			.filter(|entry| entry.key().period_unit == from && entry.key().period_start < older_than)
			.map(|entry| entry.key().clone())
			.collect();
		keys.sort_by_key(|key| key.period_start);

		let mut compacted = 0;
		for key in keys.into_iter().take(batch_size) {
			let Some((_, bucket)) = self.buckets.remove(&key) else {
				continue;
			};
			self.upsert_bucket(
				&bucket.workflow,
				to,
				to.truncate(bucket.period_start),
				bucket.metric_type,
				bucket.value,
			);
			compacted += 1;
		}

		if compacted > 0 {
			debug!("Compacted {} {} buckets into {} buckets", compacted, from, to);
		}
		Ok(compacted)
	}

	async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
		let _guard = self.maintenance.lock().await;

		let before = self.buckets.len();
		self.buckets.retain(|key, _| key.period_start >= cutoff);
		let pruned = before.saturating_sub(self.buckets.len());

		if pruned > 0 {
			debug!("Pruned {} buckets older than {}", pruned, cutoff);
		}
		Ok(pruned)
	}
}

#[async_trait]
impl Storage for MemoryStore {
	async fn health_check(&self) -> StorageResult<bool> {
		Ok(true)
	}

	async fn stats(&self) -> StorageResult<StorageStats> {
		let workflows: HashSet<String> = self
			.buckets
			.iter()
			.map(|entry| entry.key().workflow_id.clone())
			.collect();

		Ok(StorageStats {
			raw_events: self.raw.len(),
			buckets: self.buckets.len(),
			workflows: workflows.len(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use insights_types::{SortDirection, WorkflowSortBy, WorkflowSortField};

	fn workflow(id: &str) -> WorkflowRef {
		WorkflowRef::new(id, format!("Workflow {}", id))
	}

	fn query(sort_by: WorkflowSortBy, skip: usize, take: usize) -> WorkflowInsightsQuery {
		WorkflowInsightsQuery {
			max_age_in_days: 7,
			skip,
			take,
			sort_by,
		}
	}

	#[tokio::test]
	async fn test_insert_and_compact_raw_events() {
		let store = MemoryStore::new();
		let now = Utc::now();
		let events = vec![
			RawInsight::success(workflow("a"), 100, now).with_time_saved(2.0),
			RawInsight::success(workflow("a"), 300, now),
			RawInsight::failure(workflow("a"), 50, now),
		];

		assert_eq!(store.insert_raw_events(events).await.unwrap(), 3);
		assert_eq!(store.raw_event_count().await.unwrap(), 3);

		assert_eq!(store.compact_raw_to_hour(2).await.unwrap(), 2);
		assert_eq!(store.compact_raw_to_hour(10).await.unwrap(), 1);
		assert_eq!(store.raw_event_count().await.unwrap(), 0);

		let hourly = store.buckets_of(PeriodUnit::Hour);
		let value_of = |metric_type: MetricType| {
			hourly
				.iter()
				.find(|bucket| bucket.metric_type == metric_type)
				.map(|bucket| bucket.value)
		};
		assert_eq!(value_of(MetricType::Success), Some(2.0));
		assert_eq!(value_of(MetricType::Failure), Some(1.0));
		assert_eq!(value_of(MetricType::RuntimeMs), Some(450.0));
		assert_eq!(value_of(MetricType::TimeSavedMin), Some(2.0));
	}

	#[tokio::test]
	async fn test_compact_hour_buckets_into_days() {
		let store = MemoryStore::new();
		let old = Utc::now() - Duration::days(100);
		let day_start = PeriodUnit::Day.truncate(old);

		store.upsert_bucket(&workflow("a"), PeriodUnit::Hour, day_start, MetricType::Success, 3.0);
		store.upsert_bucket(
			&workflow("a"),
			PeriodUnit::Hour,
			day_start + Duration::hours(5),
			MetricType::Success,
			4.0,
		);
		store.upsert_bucket(&workflow("a"), PeriodUnit::Hour, Utc::now(), MetricType::Success, 1.0);

		let threshold = Utc::now() - Duration::days(90);
		let compacted = store
			.compact_period(PeriodUnit::Hour, threshold, 100)
			.await
			.unwrap();

		assert_eq!(compacted, 2);
		let daily = store.buckets_of(PeriodUnit::Day);
		assert_eq!(daily.len(), 1);
		assert_eq!(daily[0].period_start, day_start);
		assert_eq!(daily[0].value, 7.0);
		assert_eq!(store.buckets_of(PeriodUnit::Hour).len(), 1);
	}

	#[tokio::test]
	async fn test_week_buckets_cannot_be_compacted() {
		let store = MemoryStore::new();
		let result = store.compact_period(PeriodUnit::Week, Utc::now(), 10).await;
		assert!(matches!(result, Err(StorageError::InvalidQuery { .. })));
	}

	#[tokio::test]
	async fn test_prune_removes_only_old_buckets() {
		let store = MemoryStore::new();
		let now = Utc::now();
		store.upsert_bucket(
			&workflow("a"),
			PeriodUnit::Day,
			now - Duration::days(40),
			MetricType::Success,
			1.0,
		);
		store.upsert_bucket(&workflow("a"), PeriodUnit::Hour, now, MetricType::Success, 1.0);

		let pruned = store.prune_older_than(now - Duration::days(30)).await.unwrap();
		assert_eq!(pruned, 1);
		assert_eq!(store.stats().await.unwrap().buckets, 1);
	}

	#[tokio::test]
	async fn test_period_type_aggregates_split_windows() {
		let store = MemoryStore::new();
		let now = Utc::now();
		store.upsert_bucket(
			&workflow("a"),
			PeriodUnit::Hour,
			now - Duration::days(1),
			MetricType::Success,
			5.0,
		);
		store.upsert_bucket(
			&workflow("b"),
			PeriodUnit::Hour,
			now - Duration::days(2),
			MetricType::Success,
			2.0,
		);
		store.upsert_bucket(
			&workflow("a"),
			PeriodUnit::Day,
			now - Duration::days(10),
			MetricType::Failure,
			4.0,
		);

		let rows = store
			.previous_and_current_period_type_aggregates(7)
			.await
			.unwrap();

		assert!(rows.contains(&PeriodTypeAggregate::new(
			PeriodWindow::Current,
			MetricType::Success,
			Some(7.0)
		)));
		assert!(rows.contains(&PeriodTypeAggregate::new(
			PeriodWindow::Previous,
			MetricType::Failure,
			Some(4.0)
		)));
		assert_eq!(rows.len(), 2);
	}

	#[tokio::test]
	async fn test_insights_by_workflow_sorts_and_pages() {
		let store = MemoryStore::new();
		let now = Utc::now();
		for (id, successes, failures) in [("a", 10.0, 0.0), ("b", 1.0, 1.0), ("c", 4.0, 4.0)] {
			store.upsert_bucket(&workflow(id), PeriodUnit::Hour, now, MetricType::Success, successes);
			store.upsert_bucket(&workflow(id), PeriodUnit::Hour, now, MetricType::Failure, failures);
			store.upsert_bucket(&workflow(id), PeriodUnit::Hour, now, MetricType::RuntimeMs, 100.0);
		}

		let by_total = WorkflowSortBy::new(WorkflowSortField::Total, SortDirection::Desc);
		let page = store.insights_by_workflow(&query(by_total, 0, 2)).await.unwrap();
		assert_eq!(page.count, 3);
		let ids: Vec<&str> = page.rows.iter().map(|r| r.workflow_id.as_str()).collect();
		assert_eq!(ids, vec!["a", "c"]);

		let second = store.insights_by_workflow(&query(by_total, 2, 2)).await.unwrap();
		assert_eq!(second.rows.len(), 1);
		assert_eq!(second.rows[0].workflow_id, "b");
		assert_eq!(second.rows[0].failure_rate, 0.5);
		assert_eq!(second.rows[0].average_run_time, 50.0);
	}

	#[tokio::test]
	async fn test_insights_by_time_groups_by_unit() {
		let store = MemoryStore::new();
		let day_start = PeriodUnit::Day.truncate(Utc::now() - Duration::days(1));

		store.upsert_bucket(&workflow("a"), PeriodUnit::Hour, day_start, MetricType::Success, 2.0);
		store.upsert_bucket(
			&workflow("b"),
			PeriodUnit::Hour,
			day_start + Duration::hours(3),
			MetricType::Failure,
			1.0,
		);
		store.upsert_bucket(
			&workflow("b"),
			PeriodUnit::Hour,
			day_start + Duration::hours(3),
			MetricType::RuntimeMs,
			90.0,
		);

		let rows = store.insights_by_time(7, PeriodUnit::Day).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].period_start, day_start);
		assert_eq!(rows[0].succeeded, 2);
		assert_eq!(rows[0].failed, 1);
		assert_eq!(rows[0].run_time, 90.0);
	}

	#[tokio::test]
	async fn test_huge_day_counts_cover_all_history() {
		let store = MemoryStore::new();
		let now = Utc::now();
		store.upsert_bucket(&workflow("a"), PeriodUnit::Hour, now, MetricType::Success, 3.0);
		store.upsert_bucket(
			&workflow("a"),
			PeriodUnit::Week,
			PeriodUnit::Week.truncate(now - Duration::days(5000)),
			MetricType::Failure,
			1.0,
		);

		let rows = store
			.previous_and_current_period_type_aggregates(u32::MAX)
			.await
			.unwrap();
		assert_eq!(rows.len(), 2);
		assert!(rows.iter().all(|row| row.period == PeriodWindow::Current));

		let by_total = WorkflowSortBy::new(WorkflowSortField::Total, SortDirection::Desc);
		let mut everything = query(by_total, 0, 10);
		everything.max_age_in_days = u32::MAX;
		let page = store.insights_by_workflow(&everything).await.unwrap();
		assert_eq!(page.rows[0].total, 4);

		let series = store.insights_by_time(u32::MAX, PeriodUnit::Week).await.unwrap();
		assert_eq!(series.len(), 2);
	}

	#[tokio::test]
	async fn test_skip_past_the_end_keeps_count() {
		let store = MemoryStore::new();
		let now = Utc::now();
		for id in ["a", "b"] {
			store.upsert_bucket(&workflow(id), PeriodUnit::Hour, now, MetricType::Success, 1.0);
		}

		let by_name = WorkflowSortBy::new(WorkflowSortField::WorkflowName, SortDirection::Asc);
		for skip in [2, 50] {
			let page = store.insights_by_workflow(&query(by_name, skip, 10)).await.unwrap();
			assert_eq!(page.count, 2);
			assert!(page.rows.is_empty());
		}
	}

	#[tokio::test]
	async fn test_stats_counts_rows_and_workflows() {
		let store = MemoryStore::new();
		let now = Utc::now();
		store
			.insert_raw_events(vec![RawInsight::success(workflow("a"), 10, now)])
			.await
			.unwrap();
		store.upsert_bucket(&workflow("a"), PeriodUnit::Hour, now, MetricType::Success, 1.0);
		store.upsert_bucket(&workflow("b"), PeriodUnit::Day, now, MetricType::Failure, 1.0);

		assert_eq!(
			store.stats().await.unwrap(),
			StorageStats {
				raw_events: 1,
				buckets: 2,
				workflows: 2,
			}
		);
		assert!(store.health_check().await.unwrap());
	}
}
