//! Cancellable repeating timer shared by every scheduled job

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::{JobError, JobKind, JobResult};

/// Work performed on every tick of a [`RepeatingTimer`]
#[async_trait]
pub trait TimerTask: Send + Sync {
	async fn run_tick(&self) -> JobResult;
}

struct ActiveTimer {
	stop: Arc<Notify>,
	handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerState {
	active: Option<ActiveTimer>,
	/// Loop that was told to stop but may still be finishing a tick
	stopping: Option<JoinHandle<()>>,
}

/// Repeating timer backed by a single tokio task.
///
/// Ticks never overlap: the next sleep only starts once the previous tick has
/// resolved. Stopping cancels future ticks only; a tick that is already
/// running completes. A failed or panicking tick is logged and the timer keeps
/// going.
pub struct RepeatingTimer {
	kind: JobKind,
	interval: Duration,
	state: Mutex<TimerState>,
	ticks: Arc<AtomicU64>,
}

impl RepeatingTimer {
	pub fn new(kind: JobKind, interval: Duration) -> Self {
		Self {
			kind,
			interval,
			state: Mutex::new(TimerState::default()),
			ticks: Arc::new(AtomicU64::new(0)),
		}
	}

	pub fn kind(&self) -> JobKind {
		self.kind
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Number of ticks completed since creation
	pub fn tick_count(&self) -> u64 {
		self.ticks.load(Ordering::SeqCst)
	}

	pub async fn is_running(&self) -> bool {
		self.state.lock().await.active.is_some()
	}

	/// Start ticking. Returns `false` without side effects if already running.
	pub async fn start(&self, task: Arc<dyn TimerTask>) -> bool {
		let mut state = self.state.lock().await;
		if state.active.is_some() {
			debug!("Timer '{}' already running, start ignored", self.kind);
			return false;
		}

		// A previous loop may still be finishing its last tick
		if let Some(stopping) = state.stopping.take() {
			if let Err(e) = stopping.await {
				error!("Timer '{}' loop ended abnormally: {}", self.kind, e);
			}
		}

		let stop = Arc::new(Notify::new());
		let handle = tokio::spawn(Self::run_loop(
			self.kind,
			self.interval,
			task,
			Arc::clone(&stop),
			Arc::clone(&self.ticks),
		));
		state.active = Some(ActiveTimer { stop, handle });

		info!(
			"Started timer '{}' ({}) every {:?}",
			self.kind,
			self.kind.description(),
			self.interval
		);
		true
	}

	/// Cancel future ticks. Returns `false` if the timer was not running.
	pub async fn stop(&self) -> bool {
		let mut state = self.state.lock().await;
		let Some(active) = state.active.take() else {
			return false;
		};

		active.stop.notify_one();
		state.stopping = Some(active.handle);
		info!("Stopped timer '{}'", self.kind);
		true
	}

	/// Cancel future ticks and wait for an in-flight tick to finish
	pub async fn stop_and_wait(&self) -> bool {
		let mut state = self.state.lock().await;
		let was_running = match state.active.take() {
			Some(active) => {
				active.stop.notify_one();
				state.stopping = Some(active.handle);
				true
			},
			None => false,
		};

		if let Some(stopping) = state.stopping.take() {
			if let Err(e) = stopping.await {
				error!("Timer '{}' loop ended abnormally: {}", self.kind, e);
			}
		}

		if was_running {
			info!("Stopped timer '{}' and drained in-flight tick", self.kind);
		}
		was_running
	}

	async fn run_loop(
		kind: JobKind,
		interval: Duration,
		task: Arc<dyn TimerTask>,
		stop: Arc<Notify>,
		ticks: Arc<AtomicU64>,
	) {
		loop {
			tokio::select! {
				_ = sleep(interval) => {}
				_ = stop.notified() => {
					debug!("Timer '{}' loop exiting", kind);
					return;
				}
			}

			debug!("Running tick of '{}'", kind);
			let result = run_guarded(kind, task.as_ref()).await;
			ticks.fetch_add(1, Ordering::SeqCst);

			match result {
				Ok(()) => debug!("Tick of '{}' completed", kind),
				Err(e @ JobError::Panicked { .. }) => error!("{}", e),
				Err(e) => warn!("Tick of '{}' failed: {}", kind, e),
			}
		}
	}
}

/// Run one tick, turning a panic into [`JobError::Panicked`]
async fn run_guarded(kind: JobKind, task: &dyn TimerTask) -> JobResult {
	AssertUnwindSafe(task.run_tick())
		.catch_unwind()
		.await
		.unwrap_or_else(|_| {
			Err(JobError::Panicked {
				job: kind.to_string(),
			})
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;

	#[derive(Default)]
	struct CountingTask {
		runs: AtomicUsize,
		fail: bool,
	}

	#[async_trait]
	impl TimerTask for CountingTask {
		async fn run_tick(&self) -> JobResult {
			self.runs.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				return Err(JobError::ProcessingFailed {
					message: "boom".to_string(),
				});
			}
			Ok(())
		}
	}

	struct SlowTask {
		started: AtomicUsize,
		finished: AtomicUsize,
	}

	#[async_trait]
	impl TimerTask for SlowTask {
		async fn run_tick(&self) -> JobResult {
			self.started.fetch_add(1, Ordering::SeqCst);
			sleep(Duration::from_secs(30)).await;
			self.finished.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	struct PanickingTask;

	#[async_trait]
	impl TimerTask for PanickingTask {
		async fn run_tick(&self) -> JobResult {
			panic!("tick exploded");
		}
	}

	#[tokio::test]
	async fn test_panicking_tick_maps_to_job_error() {
		let err = run_guarded(JobKind::Pruning, &PanickingTask).await.unwrap_err();
		assert!(matches!(err, JobError::Panicked { ref job } if job == "insights-pruning"));

		let ok = run_guarded(JobKind::Pruning, &CountingTask::default()).await;
		assert!(ok.is_ok());
	}

	#[tokio::test(start_paused = true)]
	async fn test_panicking_tick_does_not_stop_timer() {
		let timer = RepeatingTimer::new(JobKind::Compaction, Duration::from_secs(60));
		assert!(timer.start(Arc::new(PanickingTask)).await);

		sleep(Duration::from_secs(121)).await;
		assert_eq!(timer.tick_count(), 2);
		assert!(timer.is_running().await);
		timer.stop_and_wait().await;
	}

	#[tokio::test(start_paused = true)]
	async fn test_ticks_at_interval() {
		let timer = RepeatingTimer::new(JobKind::Compaction, Duration::from_secs(60));
		let task = Arc::new(CountingTask::default());

		assert!(timer.start(task.clone()).await);
		sleep(Duration::from_secs(181)).await;

		assert_eq!(task.runs.load(Ordering::SeqCst), 3);
		assert!(timer.stop().await);
	}

	#[tokio::test(start_paused = true)]
	async fn test_double_start_keeps_single_schedule() {
		let timer = RepeatingTimer::new(JobKind::Pruning, Duration::from_secs(60));
		let task = Arc::new(CountingTask::default());

		assert!(timer.start(task.clone()).await);
		assert!(!timer.start(task.clone()).await);
		sleep(Duration::from_secs(61)).await;

		assert_eq!(task.runs.load(Ordering::SeqCst), 1);
		assert_eq!(timer.tick_count(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stop_cancels_future_ticks() {
		let timer = RepeatingTimer::new(JobKind::Compaction, Duration::from_secs(60));
		let task = Arc::new(CountingTask::default());

		timer.start(task.clone()).await;
		sleep(Duration::from_secs(61)).await;
		assert!(timer.stop().await);
		assert!(!timer.stop().await);
		sleep(Duration::from_secs(600)).await;

		assert_eq!(task.runs.load(Ordering::SeqCst), 1);
		assert!(!timer.is_running().await);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failing_tick_does_not_stop_timer() {
		let timer = RepeatingTimer::new(JobKind::Collection, Duration::from_secs(10));
		let task = Arc::new(CountingTask {
			runs: AtomicUsize::new(0),
			fail: true,
		});

		timer.start(task.clone()).await;
		sleep(Duration::from_secs(35)).await;

		assert_eq!(task.runs.load(Ordering::SeqCst), 3);
		assert!(timer.is_running().await);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stop_and_wait_lets_in_flight_tick_finish() {
		let timer = RepeatingTimer::new(JobKind::Compaction, Duration::from_secs(10));
		let task = Arc::new(SlowTask {
			started: AtomicUsize::new(0),
			finished: AtomicUsize::new(0),
		});

		timer.start(task.clone()).await;
		// first tick starts at t=10s and runs until t=40s
		sleep(Duration::from_secs(15)).await;
		assert_eq!(task.started.load(Ordering::SeqCst), 1);
		assert_eq!(task.finished.load(Ordering::SeqCst), 0);

		assert!(timer.stop_and_wait().await);
		assert_eq!(task.finished.load(Ordering::SeqCst), 1);

		sleep(Duration::from_secs(100)).await;
		assert_eq!(task.started.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_restart_after_stop_waits_for_previous_tick() {
		let timer = RepeatingTimer::new(JobKind::Compaction, Duration::from_secs(10));
		let task = Arc::new(SlowTask {
			started: AtomicUsize::new(0),
			finished: AtomicUsize::new(0),
		});

		timer.start(task.clone()).await;
		sleep(Duration::from_secs(15)).await;
		timer.stop().await;

		assert!(timer.start(task.clone()).await);
		// the old tick resolved before the new loop was spawned
		assert_eq!(task.finished.load(Ordering::SeqCst), 1);
		assert!(timer.is_running().await);
	}
}
