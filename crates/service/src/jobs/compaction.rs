//! Roll-up of fine-grained insights into coarser periods (leader only)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insights_config::CompactionSettings;
use insights_types::{InsightsMaintenanceStorageTrait, PeriodUnit, StorageResult};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use super::timer::{RepeatingTimer, TimerTask};
use super::types::{cutoff_before, JobError, JobKind, JobResult};

/// Rows moved by each compaction step of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
	pub raw_to_hour: usize,
	pub hour_to_day: usize,
	pub day_to_week: usize,
}

impl CompactionReport {
	pub fn total(&self) -> usize {
		self.raw_to_hour + self.hour_to_day + self.day_to_week
	}
}

pub struct CompactionJob {
	storage: Arc<dyn InsightsMaintenanceStorageTrait>,
	settings: CompactionSettings,
	timer: RepeatingTimer,
}

impl CompactionJob {
	pub fn new(storage: Arc<dyn InsightsMaintenanceStorageTrait>, settings: &CompactionSettings) -> Self {
		Self {
			storage,
			settings: settings.clone(),
			timer: RepeatingTimer::new(JobKind::Compaction, settings.interval()),
		}
	}

	/// Run every compaction step once against `now`
	pub async fn compact(&self) -> JobResult<CompactionReport> {
		self.compact_at(Utc::now()).await
	}

	pub async fn compact_at(&self, now: DateTime<Utc>) -> JobResult<CompactionReport> {
		let batch_size = self.settings.batch_size.max(1);
		let hour_cutoff = cutoff_before(
			now,
			i64::from(self.settings.hourly_to_daily_threshold_days),
			"hourly to daily threshold",
		)?;
		let day_cutoff = cutoff_before(
			now,
			i64::from(self.settings.daily_to_weekly_threshold_days),
			"daily to weekly threshold",
		)?;

		let report = CompactionReport {
			raw_to_hour: drain_in_batches("raw to hour", batch_size, || {
				self.storage.compact_raw_to_hour(batch_size)
			})
			.await?,
			hour_to_day: drain_in_batches("hour to day", batch_size, || {
				self.storage
					.compact_period(PeriodUnit::Hour, hour_cutoff, batch_size)
			})
			.await?,
			day_to_week: drain_in_batches("day to week", batch_size, || {
				self.storage
					.compact_period(PeriodUnit::Day, day_cutoff, batch_size)
			})
			.await?,
		};

		if report.total() > 0 {
			info!(
				"Compacted insights: {} raw, {} hourly, {} daily",
				report.raw_to_hour, report.hour_to_day, report.day_to_week
			);
		} else {
			debug!("Nothing to compact");
		}
		Ok(report)
	}

	pub async fn start_compaction_timer(self: &Arc<Self>) -> bool {
		self.timer.start(Arc::clone(self) as Arc<dyn TimerTask>).await
	}

	pub async fn stop_compaction_timer(&self) -> bool {
		self.timer.stop().await
	}

	pub async fn is_running(&self) -> bool {
		self.timer.is_running().await
	}
}

/// Repeat `step` until a batch comes back short
async fn drain_in_batches<F, Fut>(label: &str, batch_size: usize, mut step: F) -> JobResult<usize>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = StorageResult<usize>>,
{
	let mut total = 0;
	loop {
		let compacted = step()
			.await
			.map_err(|e| JobError::Storage(format!("{} compaction failed: {}", label, e)))?;
		total += compacted;
		if compacted < batch_size {
			return Ok(total);
		}
	}
}

#[async_trait]
impl TimerTask for CompactionJob {
	async fn run_tick(&self) -> JobResult {
		self.compact().await.map(|_| ())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration as ChronoDuration;
	use insights_types::StorageError;
	use std::sync::Mutex;

	/// Hands out a fixed number of rows per step in `batch_size` chunks
	struct ScriptedStorage {
		raw: Mutex<usize>,
		hourly: Mutex<usize>,
		daily: Mutex<usize>,
		calls: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
		fail_daily: bool,
	}

	impl ScriptedStorage {
		fn new(raw: usize, hourly: usize, daily: usize) -> Self {
			Self {
				raw: Mutex::new(raw),
				hourly: Mutex::new(hourly),
				daily: Mutex::new(daily),
				calls: Mutex::new(Vec::new()),
				fail_daily: false,
			}
		}

		fn take(pool: &Mutex<usize>, batch_size: usize) -> usize {
			let mut left = pool.lock().unwrap();
			let taken = (*left).min(batch_size);
			*left -= taken;
			taken
		}
	}

	#[async_trait]
	impl InsightsMaintenanceStorageTrait for ScriptedStorage {
		async fn compact_raw_to_hour(&self, batch_size: usize) -> StorageResult<usize> {
			self.calls.lock().unwrap().push(("raw".into(), None));
			Ok(Self::take(&self.raw, batch_size))
		}

		async fn compact_period(
			&self,
			from: PeriodUnit,
			older_than: DateTime<Utc>,
			batch_size: usize,
		) -> StorageResult<usize> {
			self.calls
				.lock()
				.unwrap()
				.push((from.to_string(), Some(older_than)));
			match from {
				PeriodUnit::Hour => Ok(Self::take(&self.hourly, batch_size)),
				PeriodUnit::Day if self.fail_daily => Err(StorageError::Operation {
					message: "locked".into(),
				}),
				PeriodUnit::Day => Ok(Self::take(&self.daily, batch_size)),
				PeriodUnit::Week => Ok(0),
			}
		}

		async fn prune_older_than(&self, _cutoff: DateTime<Utc>) -> StorageResult<usize> {
			Ok(0)
		}
	}

	fn settings(batch_size: usize) -> CompactionSettings {
		CompactionSettings {
			interval_minutes: 60,
			batch_size,
			hourly_to_daily_threshold_days: 90,
			daily_to_weekly_threshold_days: 180,
		}
	}

	#[tokio::test]
	async fn test_compact_runs_steps_in_order_until_short_batch() {
		let storage = Arc::new(ScriptedStorage::new(25, 10, 0));
		let job = CompactionJob::new(storage.clone(), &settings(10));
		let now = Utc::now();

		let report = job.compact_at(now).await.unwrap();

		assert_eq!(
			report,
			CompactionReport {
				raw_to_hour: 25,
				hour_to_day: 10,
				day_to_week: 0,
			}
		);

		let calls = storage.calls.lock().unwrap().clone();
		let steps: Vec<&str> = calls.iter().map(|(step, _)| step.as_str()).collect();
		// 10 + 10 + 5 raw, then 10 + 0 hourly, then a single empty daily batch
		assert_eq!(steps, vec!["raw", "raw", "raw", "hour", "hour", "day"]);
		assert_eq!(calls[3].1, Some(now - ChronoDuration::days(90)));
		assert_eq!(calls[5].1, Some(now - ChronoDuration::days(180)));
	}

	#[tokio::test]
	async fn test_compact_reports_storage_failure() {
		let mut storage = ScriptedStorage::new(0, 0, 5);
		storage.fail_daily = true;
		let job = CompactionJob::new(Arc::new(storage), &settings(10));

		let err = job.compact().await.unwrap_err();
		assert!(matches!(err, JobError::Storage(message) if message.contains("day to week")));
	}

	#[tokio::test]
	async fn test_unrepresentable_threshold_fails_before_any_step() {
		let storage = Arc::new(ScriptedStorage::new(5, 0, 0));
		let mut thresholds = settings(10);
		thresholds.hourly_to_daily_threshold_days = u32::MAX;
		thresholds.daily_to_weekly_threshold_days = u32::MAX;
		let job = CompactionJob::new(storage.clone(), &thresholds);

		let err = job.compact().await.unwrap_err();
		assert!(matches!(err, JobError::ProcessingFailed { ref message } if message.contains("hourly to daily")));
		assert!(storage.calls.lock().unwrap().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_compaction_timer_is_single_instance() {
		let storage = Arc::new(ScriptedStorage::new(0, 0, 0));
		let job = Arc::new(CompactionJob::new(storage.clone(), &settings(10)));

		assert!(job.start_compaction_timer().await);
		assert!(!job.start_compaction_timer().await);
		tokio::time::sleep(std::time::Duration::from_secs(60 * 60 + 1)).await;

		let raw_calls = storage
			.calls
			.lock()
			.unwrap()
			.iter()
			.filter(|(step, _)| step == "raw")
			.count();
		assert_eq!(raw_calls, 1);
		assert!(job.stop_compaction_timer().await);
		assert!(!job.stop_compaction_timer().await);
	}
}
