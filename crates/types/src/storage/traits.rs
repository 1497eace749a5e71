//! Storage traits for pluggable metrics repositories
//!
//! The traits are split by concern so that each job and service only
//! receives the slice of the repository it actually needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::StorageResult;
use crate::events::RawInsight;
use crate::insights::{
	PeriodTypeAggregate, PeriodUnit, TimeBucketRow, WorkflowInsightsPage, WorkflowInsightsQuery,
};

/// Statistics about storage usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
	pub raw_events: usize,
	pub buckets: usize,
	pub workflows: usize,
}

/// Write side used by the collection job
#[async_trait]
pub trait InsightsRawStorageTrait: Send + Sync {
	/// Persist a batch of finished executions, returning how many were written
	async fn insert_raw_events(&self, events: Vec<RawInsight>) -> StorageResult<usize>;

	/// Number of executions waiting to be compacted
	async fn raw_event_count(&self) -> StorageResult<usize>;
}

/// Read side used by the aggregation engine
#[async_trait]
pub trait InsightsQueryStorageTrait: Send + Sync {
	/// Sum of every metric type for the current and previous windows of
	/// `period_length_in_days`. Missing combinations may be omitted.
	async fn previous_and_current_period_type_aggregates(
		&self,
		period_length_in_days: u32,
	) -> StorageResult<Vec<PeriodTypeAggregate>>;

	/// Per-workflow totals, sorted and paged according to `query`
	async fn insights_by_workflow(
		&self,
		query: &WorkflowInsightsQuery,
	) -> StorageResult<WorkflowInsightsPage>;

	/// One row per `period_unit` bucket inside the last `max_age_in_days`, oldest first
	async fn insights_by_time(
		&self,
		max_age_in_days: u32,
		period_unit: PeriodUnit,
	) -> StorageResult<Vec<TimeBucketRow>>;
}

/// Maintenance side used by the compaction and pruning jobs
#[async_trait]
pub trait InsightsMaintenanceStorageTrait: Send + Sync {
	/// Roll up to `batch_size` raw executions into hourly buckets
	async fn compact_raw_to_hour(&self, batch_size: usize) -> StorageResult<usize>;

	/// Roll up to `batch_size` buckets of unit `from` that start before
	/// `older_than` into the next coarser unit
	async fn compact_period(
		&self,
		from: PeriodUnit,
		older_than: DateTime<Utc>,
		batch_size: usize,
	) -> StorageResult<usize>;

	/// Delete every bucket that starts before `cutoff`
	async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> StorageResult<usize>;
}

/// Main storage trait that combines all storage operations
#[async_trait]
pub trait StorageTrait:
	InsightsRawStorageTrait + InsightsQueryStorageTrait + InsightsMaintenanceStorageTrait
{
	/// Health check for the storage system
	async fn health_check(&self) -> StorageResult<bool>;

	/// Get overall storage statistics
	async fn stats(&self) -> StorageResult<StorageStats>;

	/// Close the storage connection
	async fn close(&self) -> StorageResult<()> {
		Ok(())
	}
}
