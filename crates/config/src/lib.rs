//! Insights Configuration
//!
//! Configuration management and startup utilities for the insights aggregator.

pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use loader::{load_config, load_config_from, ConfigLoadError};
pub use settings::{
	CollectionSettings, CompactionSettings, ConfigValidationError, EnvironmentProfile,
	EnvironmentSettings, LeadershipSettings, LicenseSettings, LogFormat, LoggingSettings,
	PruningSettings, Settings, MAX_DAY_COUNT,
};
pub use startup_logger::{log_service_info, log_service_shutdown, log_startup_complete};
