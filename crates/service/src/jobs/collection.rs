//! Buffered collection of finished executions

use async_trait::async_trait;
use insights_config::CollectionSettings;
use insights_types::{InsightsRawStorageTrait, RawInsight};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::timer::{RepeatingTimer, TimerTask};
use super::types::{JobError, JobKind, JobResult};

/// Buffers execution events in memory and writes them to storage in batches.
///
/// Runs on every instance regardless of leadership.
pub struct CollectionJob {
	storage: Arc<dyn InsightsRawStorageTrait>,
	flush_batch_size: usize,
	buffer: Mutex<Vec<RawInsight>>,
	/// Serializes flushes so batches reach storage in order
	flush_lock: Mutex<()>,
	shutting_down: AtomicBool,
	timer: RepeatingTimer,
}

impl CollectionJob {
	pub fn new(storage: Arc<dyn InsightsRawStorageTrait>, settings: &CollectionSettings) -> Self {
		Self {
			storage,
			flush_batch_size: settings.flush_batch_size.max(1),
			buffer: Mutex::new(Vec::new()),
			flush_lock: Mutex::new(()),
			shutting_down: AtomicBool::new(false),
			timer: RepeatingTimer::new(JobKind::Collection, settings.flush_interval()),
		}
	}

	/// Queue an event. A full buffer, or a job that is shutting down, flushes immediately.
	pub async fn record(&self, event: RawInsight) {
		let buffered = {
			let mut buffer = self.buffer.lock().await;
			buffer.push(event);
			buffer.len()
		};

		if buffered >= self.flush_batch_size || self.shutting_down.load(Ordering::SeqCst) {
			if let Err(e) = self.flush().await {
				warn!("Immediate insights flush failed: {}", e);
			}
		}
	}

	pub async fn buffered_count(&self) -> usize {
		self.buffer.lock().await.len()
	}

	/// Write every buffered event to storage.
	///
	/// On failure the batch is put back in front of anything recorded since,
	/// so the next flush retries it in order.
	pub async fn flush(&self) -> JobResult<usize> {
		let _flushing = self.flush_lock.lock().await;

		let batch = std::mem::take(&mut *self.buffer.lock().await);
		if batch.is_empty() {
			return Ok(0);
		}

		let count = batch.len();
		match self.storage.insert_raw_events(batch.clone()).await {
			Ok(written) => {
				debug!("Flushed {} buffered insights", written);
				Ok(written)
			},
			Err(e) => {
				let mut buffer = self.buffer.lock().await;
				let recorded_since = std::mem::replace(&mut *buffer, batch);
				buffer.extend(recorded_since);
				Err(JobError::Storage(format!(
					"failed to flush {} insights: {}",
					count, e
				)))
			},
		}
	}

	pub async fn start_flushing_timer(self: &Arc<Self>) -> bool {
		self.shutting_down.store(false, Ordering::SeqCst);
		self.timer.start(Arc::clone(self) as Arc<dyn TimerTask>).await
	}

	pub async fn stop_flushing_timer(&self) -> bool {
		self.timer.stop().await
	}

	pub async fn is_running(&self) -> bool {
		self.timer.is_running().await
	}

	/// Stop the timer, wait for an in-flight flush, then flush what is left
	pub async fn shutdown(&self) -> JobResult<usize> {
		self.shutting_down.store(true, Ordering::SeqCst);
		self.timer.stop_and_wait().await;

		let flushed = self.flush().await?;
		info!("Collection drained, {} insights flushed on shutdown", flushed);
		Ok(flushed)
	}
}

#[async_trait]
impl TimerTask for CollectionJob {
	async fn run_tick(&self) -> JobResult {
		self.flush().await.map(|_| ())
	}
}
