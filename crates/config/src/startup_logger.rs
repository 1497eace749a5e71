//! Service startup logging for the insights aggregator
//!
//! Logs service information, environment details and the job configuration
//! at startup and shutdown.

use std::env;
use tracing::info;

use crate::Settings;

/// Logs comprehensive service information at startup
pub fn log_service_info() {
	// Use the root package name and version, not the current crate
	let service_name = "insights-aggregator";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Insights Aggregator Service Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);

	// Log target information
	info!("💻 Platform: {}", env::consts::OS);
	info!("🏗️ Architecture: {}", env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {}", rust_log);
	}

	if let Ok(config_path) = env::var("CONFIG_PATH") {
		info!("📋 Config Path: {}", config_path);
	}

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs service shutdown information
pub fn log_service_shutdown() {
	info!("🛑 Insights Aggregator Service Shutting Down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs the effective job configuration once every component is wired
pub fn log_startup_complete(settings: &Settings) {
	info!("✅ Insights Aggregator Service Started Successfully");
	info!(
		"🆔 Instance: {} (leader at startup: {})",
		settings.leadership.instance_id, settings.leadership.is_leader
	);
	info!(
		"  - collection: flush every {}s or {} events",
		settings.collection.flush_interval_seconds, settings.collection.flush_batch_size
	);
	info!(
		"  - compaction: every {}m, batch {}",
		settings.compaction.interval_minutes, settings.compaction.batch_size
	);
	if settings.pruning.is_enabled() {
		info!(
			"  - pruning: every {}h, max age {} days",
			settings.pruning.check_interval_hours, settings.pruning.max_age_days
		);
	} else {
		info!("  - pruning: disabled");
	}
}
