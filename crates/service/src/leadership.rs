//! Leadership signal and event dispatch
//!
//! The election itself happens elsewhere. This module holds the local view of
//! whether this instance is leader and fans takeover/stepdown/shutdown
//! notifications out to registered hooks.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::jobs::JobResult;

/// Local belief about whether this instance currently leads
#[cfg_attr(test, mockall::automock)]
pub trait LeadershipSignal: Send + Sync {
	fn is_leader(&self) -> bool;
}

/// Leadership flag seeded from settings and flipped by the election
#[derive(Debug, Default)]
pub struct LeadershipState {
	is_leader: AtomicBool,
}

impl LeadershipState {
	pub fn new(is_leader: bool) -> Self {
		Self {
			is_leader: AtomicBool::new(is_leader),
		}
	}

	/// Record the election outcome; returns the previous value
	pub fn set_leader(&self, is_leader: bool) -> bool {
		self.is_leader.swap(is_leader, Ordering::SeqCst)
	}
}

impl LeadershipSignal for LeadershipState {
	fn is_leader(&self) -> bool {
		self.is_leader.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadershipEvent {
	Takeover,
	Stepdown,
	Shutdown,
}

impl LeadershipEvent {
	pub fn as_str(&self) -> &'static str {
		match self {
			LeadershipEvent::Takeover => "leader-takeover",
			LeadershipEvent::Stepdown => "leader-stepdown",
			LeadershipEvent::Shutdown => "shutdown",
		}
	}
}

impl std::fmt::Display for LeadershipEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Reactions to leadership transitions. Every hook must be idempotent.
#[async_trait]
pub trait LeadershipHooks: Send + Sync {
	async fn on_leader_takeover(&self) -> JobResult;

	async fn on_leader_stepdown(&self) -> JobResult;

	async fn on_shutdown(&self) -> JobResult;
}

/// Ordered fan-out of leadership events to registered hooks
#[derive(Default)]
pub struct LeadershipEventBus {
	hooks: RwLock<Vec<Arc<dyn LeadershipHooks>>>,
}

impl LeadershipEventBus {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn register(&self, hooks: Arc<dyn LeadershipHooks>) {
		let mut registered = self.hooks.write().await;
		registered.push(hooks);
		debug!("Registered leadership hooks ({} total)", registered.len());
	}

	pub async fn hook_count(&self) -> usize {
		self.hooks.read().await.len()
	}

	/// Await every hook in registration order.
	///
	/// A failing hook does not prevent later hooks from running; the first
	/// error is returned once all hooks have been called.
	pub async fn dispatch(&self, event: LeadershipEvent) -> JobResult {
		let hooks = self.hooks.read().await.clone();
		info!("Dispatching '{}' to {} hooks", event, hooks.len());

		let mut first_error = None;
		for hook in hooks {
			let result = match event {
				LeadershipEvent::Takeover => hook.on_leader_takeover().await,
				LeadershipEvent::Stepdown => hook.on_leader_stepdown().await,
				LeadershipEvent::Shutdown => hook.on_shutdown().await,
			};

			if let Err(e) = result {
				error!("Hook failed while handling '{}': {}", event, e);
				first_error.get_or_insert(e);
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}
