//! Leadership lifecycle controller
//!
//! Keeps the job timers in line with this instance's role:
//!
//! | Event                | Compaction / Pruning          | Collection          |
//! |----------------------|-------------------------------|---------------------|
//! | takeover, leader     | started                       | started             |
//! | takeover, follower   | unchanged                     | started             |
//! | stepdown             | stopped                       | unchanged           |
//! | shutdown             | stopped after collection      | drained and stopped |
//!
//! Starting a running timer and stopping a stopped one are no-ops, so every
//! entry point may be called repeatedly.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::jobs::{CollectionJob, CompactionJob, JobResult, PruningJob};
use crate::leadership::{LeadershipHooks, LeadershipSignal};

pub struct InsightsLifecycle {
	collection: Arc<CollectionJob>,
	compaction: Arc<CompactionJob>,
	pruning: Arc<PruningJob>,
	leadership: Arc<dyn LeadershipSignal>,
}

/// Which job timers are currently scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleStatus {
	pub collection: bool,
	pub compaction: bool,
	pub pruning: bool,
}

impl InsightsLifecycle {
	pub fn new(
		collection: Arc<CollectionJob>,
		compaction: Arc<CompactionJob>,
		pruning: Arc<PruningJob>,
		leadership: Arc<dyn LeadershipSignal>,
	) -> Self {
		Self {
			collection,
			compaction,
			pruning,
			leadership,
		}
	}

	/// Bootstrap at process start, using the startup leadership flag
	pub async fn start(&self) {
		info!(
			"Starting insights lifecycle as {}",
			if self.leadership.is_leader() {
				"leader"
			} else {
				"follower"
			}
		);
		self.start_timers().await;
	}

	pub async fn start_compaction_and_pruning_timers(&self) {
		self.compaction.start_compaction_timer().await;
		if self.pruning.is_enabled() {
			self.pruning.start_pruning_timer().await;
		} else {
			debug!("Pruning disabled, leaving its timer stopped");
		}
	}

	pub async fn stop_compaction_and_pruning_timers(&self) {
		let compaction = self.compaction.stop_compaction_timer().await;
		let pruning = self.pruning.stop_pruning_timer().await;
		if !compaction && !pruning {
			debug!("Compaction and pruning timers were not running");
		}
	}

	pub async fn status(&self) -> LifecycleStatus {
		LifecycleStatus {
			collection: self.collection.is_running().await,
			compaction: self.compaction.is_running().await,
			pruning: self.pruning.is_running().await,
		}
	}

	async fn start_timers(&self) {
		self.collection.start_flushing_timer().await;
		if self.leadership.is_leader() {
			self.start_compaction_and_pruning_timers().await;
		}
	}
}

#[async_trait]
impl LeadershipHooks for InsightsLifecycle {
	async fn on_leader_takeover(&self) -> JobResult {
		info!("Leader takeover received");
		self.start_timers().await;
		Ok(())
	}

	async fn on_leader_stepdown(&self) -> JobResult {
		info!("Leader stepdown received");
		self.stop_compaction_and_pruning_timers().await;
		Ok(())
	}

	/// Drains collection before stopping the leader-only timers
	async fn on_shutdown(&self) -> JobResult {
		info!("Shutting down insights jobs");
		let drained = self.collection.shutdown().await;
		self.stop_compaction_and_pruning_timers().await;
		drained.map(|_| ())
	}
}
