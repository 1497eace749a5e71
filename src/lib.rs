//! Insights Aggregator Library
//!
//! Leader-coordinated collection, compaction and pruning of workflow
//! execution insights, plus the read-side aggregation served by every
//! instance.

// Core domain types - the most commonly used types
pub use insights_types::{
	chrono,
	// External dependencies for convenience
	serde_json,
	DateRangeDescriptor,
	DateRangeKey,
	ExecutionStatus,
	InsightsByTime,
	InsightsByWorkflow,
	// Error types
	InsightsError,
	InsightsErrorKind,
	InsightsResult,
	InsightsSummary,
	LicensePolicy,
	MetricType,
	PeriodUnit,
	RawInsight,
	ResolvedDateRange,
	StorageStats,
	SummaryMetric,
	WorkflowRef,
};

// Service layer
pub use insights_service::{
	CollectionJob, CompactionJob, CompactionReport, InsightsLifecycle, InsightsService,
	InsightsServiceTrait, JobError, JobResult, LeadershipEvent, LeadershipEventBus,
	LeadershipHooks, LeadershipSignal, LeadershipState, LifecycleStatus, PruningJob,
	TierLicensePolicy,
};

// Storage layer
pub use insights_storage::{MemoryStore, Storage};

// Config
pub use insights_config::{
	load_config, log_service_info, log_service_shutdown, log_startup_complete, Settings,
};

pub mod models {
	pub use insights_types::*;
}

pub mod storage {
	pub use insights_storage::*;
}

pub mod config {
	pub use insights_config::*;
}

pub mod service {
	pub use insights_service::*;
}

use insights_config::LogFormat;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

// Re-export external dependencies for embedders
pub use async_trait;

/// Builder pattern for configuring the insights aggregator
pub struct InsightsBuilder<S = MemoryStore>
where
	S: Storage + 'static,
{
	settings: Option<Settings>,
	storage: S,
	license_policy: Option<Arc<dyn LicensePolicy>>,
}

impl<S> InsightsBuilder<S>
where
	S: Storage + 'static,
{
	/// Create a new builder with the provided storage
	pub fn with_storage(storage: S) -> Self {
		Self {
			settings: None,
			storage,
			license_policy: None,
		}
	}
}

// Default constructor using MemoryStore for convenience
impl Default for InsightsBuilder<MemoryStore> {
	fn default() -> Self {
		Self::new()
	}
}

impl InsightsBuilder<MemoryStore> {
	/// Create a new builder with default memory storage
	pub fn new() -> Self {
		Self::with_storage(MemoryStore::new())
	}

	/// Create a builder from configuration using default memory storage
	pub fn from_config(settings: Settings) -> Self {
		Self::new().with_settings(settings)
	}
}

impl<S> InsightsBuilder<S>
where
	S: Storage + 'static,
{
	/// Set custom settings
	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// Replace the configuration-driven license policy
	pub fn with_license_policy(mut self, policy: Arc<dyn LicensePolicy>) -> Self {
		self.license_policy = Some(policy);
		self
	}

	/// Get the current settings
	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Wire storage, jobs, the lifecycle controller and the event bus
	pub async fn build(self) -> Result<InsightsAggregator<S>, Box<dyn std::error::Error>> {
		let settings = self.settings.unwrap_or_default();
		settings.validate()?;

		let storage = Arc::new(self.storage);
		let license_policy = self.license_policy.unwrap_or_else(|| {
			Arc::new(TierLicensePolicy::from_settings(&settings.license)) as Arc<dyn LicensePolicy>
		});

		let insights = Arc::new(InsightsService::new(storage.clone(), license_policy))
			as Arc<dyn InsightsServiceTrait>;
		let collection = Arc::new(CollectionJob::new(storage.clone(), &settings.collection));
		let compaction = Arc::new(CompactionJob::new(storage.clone(), &settings.compaction));
		let pruning = Arc::new(PruningJob::new(storage.clone(), &settings.pruning));

		let leadership = Arc::new(LeadershipState::new(settings.leadership.is_leader));
		let lifecycle = Arc::new(InsightsLifecycle::new(
			Arc::clone(&collection),
			Arc::clone(&compaction),
			Arc::clone(&pruning),
			leadership.clone(),
		));

		let events = Arc::new(LeadershipEventBus::new());
		events.register(lifecycle.clone()).await;

		info!(
			"Insights aggregator wired for instance '{}'",
			settings.leadership.instance_id
		);

		Ok(InsightsAggregator {
			settings,
			storage,
			insights,
			collection,
			compaction,
			pruning,
			lifecycle,
			leadership,
			events,
		})
	}

	/// Run the complete service with all defaults and setup.
	///
	/// Loads `.env` and the configuration, initializes tracing, starts the
	/// jobs for the configured role and runs until Ctrl-C, then drains the
	/// collection buffer before exiting.
	pub async fn start_service(mut self) -> Result<(), Box<dyn std::error::Error>> {
		// Load .env file if it exists
		dotenvy::dotenv().ok();

		let using_provided_settings = self.settings.is_some();
		let settings = match self.settings.take() {
			Some(settings) => settings,
			None => load_config()?,
		};

		init_tracing_from_settings(&settings).map_err(|e| e as Box<dyn std::error::Error>)?;
		log_service_info();
		info!(
			"Using configuration: loaded from {}",
			if using_provided_settings {
				"provided settings"
			} else {
				"config file or defaults"
			}
		);

		let aggregator = self.with_settings(settings).build().await?;
		aggregator.start().await;
		log_startup_complete(aggregator.settings());

		tokio::signal::ctrl_c().await?;
		info!("Shutdown signal received");

		if let Err(e) = aggregator.shutdown().await {
			error!("Insights shutdown did not complete cleanly: {}", e);
		}
		log_service_shutdown();
		Ok(())
	}
}

/// Initialize tracing with configuration-based settings.
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing_from_settings(
	settings: &Settings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	// Create env filter using config level or environment variable
	let log_level = &settings.logging.level;
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	match settings.logging.format {
		LogFormat::Json => {
			let subscriber = tracing_subscriber::fmt().json().with_env_filter(env_filter);

			if settings.logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()?;
			} else {
				subscriber.try_init()?;
			}
		},
		LogFormat::Pretty => {
			let subscriber = tracing_subscriber::fmt()
				.pretty()
				.with_env_filter(env_filter);

			if settings.logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()?;
			} else {
				subscriber.try_init()?;
			}
		},
		LogFormat::Compact => {
			let subscriber = tracing_subscriber::fmt()
				.compact()
				.with_env_filter(env_filter);

			if settings.logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()?;
			} else {
				subscriber.try_init()?;
			}
		},
	}

	info!(
		"Logging configuration applied: level={}, format={:?}, structured={}",
		settings.logging.level, settings.logging.format, settings.logging.structured
	);

	Ok(())
}

/// Point-in-time view of the storage and the job timers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
	pub storage_healthy: bool,
	pub storage: StorageStats,
	pub jobs: LifecycleStatus,
	pub is_leader: bool,
}

/// A wired insights aggregator
pub struct InsightsAggregator<S = MemoryStore>
where
	S: Storage + 'static,
{
	settings: Settings,
	storage: Arc<S>,
	insights: Arc<dyn InsightsServiceTrait>,
	collection: Arc<CollectionJob>,
	compaction: Arc<CompactionJob>,
	pruning: Arc<PruningJob>,
	lifecycle: Arc<InsightsLifecycle>,
	leadership: Arc<LeadershipState>,
	events: Arc<LeadershipEventBus>,
}

impl<S> InsightsAggregator<S>
where
	S: Storage + 'static,
{
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn storage(&self) -> &Arc<S> {
		&self.storage
	}

	/// Read-side aggregation
	pub fn insights(&self) -> Arc<dyn InsightsServiceTrait> {
		Arc::clone(&self.insights)
	}

	pub fn collection(&self) -> &Arc<CollectionJob> {
		&self.collection
	}

	pub fn compaction(&self) -> &Arc<CompactionJob> {
		&self.compaction
	}

	pub fn pruning(&self) -> &Arc<PruningJob> {
		&self.pruning
	}

	pub fn lifecycle(&self) -> &Arc<InsightsLifecycle> {
		&self.lifecycle
	}

	/// Bus for registering further hooks and delivering election outcomes
	pub fn events(&self) -> &Arc<LeadershipEventBus> {
		&self.events
	}

	pub fn is_leader(&self) -> bool {
		self.leadership.is_leader()
	}

	pub async fn health(&self) -> Result<HealthReport, Box<dyn std::error::Error>> {
		Ok(HealthReport {
			storage_healthy: self.storage.health_check().await?,
			storage: self.storage.stats().await?,
			jobs: self.lifecycle.status().await,
			is_leader: self.is_leader(),
		})
	}

	/// Start the jobs for the role configured at startup
	pub async fn start(&self) {
		self.lifecycle.start().await;
	}

	/// Buffer a finished execution for collection
	pub async fn record(&self, event: RawInsight) {
		self.collection.record(event).await;
	}

	/// This instance won the election
	pub async fn promote(&self) -> JobResult {
		self.leadership.set_leader(true);
		self.events.dispatch(LeadershipEvent::Takeover).await
	}

	/// This instance lost leadership
	pub async fn demote(&self) -> JobResult {
		self.leadership.set_leader(false);
		self.events.dispatch(LeadershipEvent::Stepdown).await
	}

	/// Drain collection, stop every job and close the storage
	pub async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error>> {
		self.events.dispatch(LeadershipEvent::Shutdown).await?;
		self.storage.close().await?;
		Ok(())
	}
}
