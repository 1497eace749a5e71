//! Deletion of insights past their retention (leader only)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insights_config::PruningSettings;
use insights_types::InsightsMaintenanceStorageTrait;
use std::sync::Arc;
use tracing::{debug, info};

use super::timer::{RepeatingTimer, TimerTask};
use super::types::{cutoff_before, JobError, JobKind, JobResult};

pub struct PruningJob {
	storage: Arc<dyn InsightsMaintenanceStorageTrait>,
	max_age_days: i64,
	timer: RepeatingTimer,
}

impl PruningJob {
	pub fn new(storage: Arc<dyn InsightsMaintenanceStorageTrait>, settings: &PruningSettings) -> Self {
		Self {
			storage,
			max_age_days: settings.max_age_days,
			timer: RepeatingTimer::new(JobKind::Pruning, settings.check_interval()),
		}
	}

	/// A negative max age disables pruning
	pub fn is_enabled(&self) -> bool {
		self.max_age_days >= 0
	}

	pub fn max_age_days(&self) -> i64 {
		self.max_age_days
	}

	/// Delete every bucket older than the configured max age
	pub async fn prune(&self) -> JobResult<usize> {
		self.prune_at(Utc::now()).await
	}

	pub async fn prune_at(&self, now: DateTime<Utc>) -> JobResult<usize> {
		if !self.is_enabled() {
			debug!("Pruning disabled, skipping");
			return Ok(0);
		}

		let cutoff = cutoff_before(now, self.max_age_days, "pruning max age")?;
		let pruned = self
			.storage
			.prune_older_than(cutoff)
			.await
			.map_err(|e| JobError::Storage(format!("pruning failed: {}", e)))?;

		if pruned > 0 {
			info!("Pruned {} insights older than {}", pruned, cutoff);
		}
		Ok(pruned)
	}

	/// Returns `false` when already running or when pruning is disabled
	pub async fn start_pruning_timer(self: &Arc<Self>) -> bool {
		if !self.is_enabled() {
			debug!("Pruning disabled, timer not started");
			return false;
		}
		self.timer.start(Arc::clone(self) as Arc<dyn TimerTask>).await
	}

	pub async fn stop_pruning_timer(&self) -> bool {
		self.timer.stop().await
	}

	pub async fn is_running(&self) -> bool {
		self.timer.is_running().await
	}
}

#[async_trait]
impl TimerTask for PruningJob {
	async fn run_tick(&self) -> JobResult {
		self.prune().await.map(|_| ())
	}
}
