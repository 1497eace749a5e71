//! Insights Types
//!
//! Shared models and traits for the workflow insights aggregator.
//! This crate contains the domain models, storage traits and collaborator
//! contracts used by the storage, service and binary crates.

pub mod date_ranges;
pub mod events;
pub mod insights;
pub mod license;
pub mod storage;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

pub use date_ranges::{DateRangeDescriptor, DateRangeKey, ResolvedDateRange};

pub use events::{ExecutionStatus, InsightsBucket, RawInsight, WorkflowRef};

pub use insights::{
	days_before, days_before_or_min, InsightsByTime, InsightsByTimeValues, InsightsByWorkflow, InsightsError, InsightsErrorKind,
	InsightsResult, InsightsSummary, MetricType, MetricUnit, PeriodTypeAggregate, PeriodUnit,
	PeriodWindow, SortDirection, SummaryMetric, TimeBucketRow, WorkflowInsightsPage,
	WorkflowInsightsQuery, WorkflowInsightsRow, WorkflowSortBy, WorkflowSortField,
};

pub use license::LicensePolicy;

pub use storage::{
	InsightsMaintenanceStorageTrait, InsightsQueryStorageTrait, InsightsRawStorageTrait,
	StorageError, StorageResult, StorageStats, StorageTrait,
};
