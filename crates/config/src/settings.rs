//! Configuration settings structures

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub collection: CollectionSettings,
	pub compaction: CompactionSettings,
	pub pruning: PruningSettings,
	pub license: LicenseSettings,
	pub leadership: LeadershipSettings,
	pub environment: EnvironmentSettings,
	pub logging: LoggingSettings,
}

/// Buffering of execution events before they are written to storage
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionSettings {
	/// Buffered events that trigger an immediate flush
	pub flush_batch_size: usize,
	/// Interval between timer-driven flushes
	pub flush_interval_seconds: u64,
}

/// Roll-up of fine-grained periods into coarser ones (leader only)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CompactionSettings {
	pub interval_minutes: u64,
	/// Rows compacted per repository call
	pub batch_size: usize,
	/// Hourly buckets older than this are rolled into daily buckets
	pub hourly_to_daily_threshold_days: u32,
	/// Daily buckets older than this are rolled into weekly buckets
	pub daily_to_weekly_threshold_days: u32,
}

/// Deletion of aged insights (leader only)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PruningSettings {
	/// Buckets older than this many days are deleted; `-1` disables pruning
	pub max_age_days: i64,
	pub check_interval_hours: u64,
}

/// License tier flags as provided by the license backend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LicenseSettings {
	/// Maximum queryable history in days; `-1` means unlimited
	pub max_history_days: i64,
	/// Whether hour-granularity data (the `day` range) may be viewed
	pub hourly_data_enabled: bool,
}

/// Startup view of this instance's role
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LeadershipSettings {
	pub instance_id: String,
	/// Whether this instance starts as leader. Later changes arrive as events.
	pub is_leader: bool,
}

/// Environment-specific settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EnvironmentSettings {
	pub profile: EnvironmentProfile,
	pub debug: bool,
}

/// Environment profiles
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentProfile {
	Development,
	Staging,
	Production,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	pub structured: bool,
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

impl Default for CollectionSettings {
	fn default() -> Self {
		Self {
			flush_batch_size: 1000,
			flush_interval_seconds: 30,
		}
	}
}

impl Default for CompactionSettings {
	fn default() -> Self {
		Self {
			interval_minutes: 60,
			batch_size: 500,
			hourly_to_daily_threshold_days: 90,
			daily_to_weekly_threshold_days: 180,
		}
	}
}

impl Default for PruningSettings {
	fn default() -> Self {
		Self {
			max_age_days: -1,
			check_interval_hours: 24,
		}
	}
}

impl Default for LicenseSettings {
	fn default() -> Self {
		Self {
			max_history_days: 7,
			hourly_data_enabled: false,
		}
	}
}

impl Default for LeadershipSettings {
	fn default() -> Self {
		Self {
			instance_id: "main".to_string(),
			is_leader: true,
		}
	}
}

impl Default for EnvironmentSettings {
	fn default() -> Self {
		Self {
			profile: EnvironmentProfile::Development,
			debug: true,
		}
	}
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

impl CollectionSettings {
	pub fn flush_interval(&self) -> Duration {
		Duration::from_secs(self.flush_interval_seconds)
	}
}

impl CompactionSettings {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_minutes.saturating_mul(60))
	}
}

impl PruningSettings {
	pub fn is_enabled(&self) -> bool {
		self.max_age_days >= 0
	}

	pub fn check_interval(&self) -> Duration {
		Duration::from_secs(self.check_interval_hours.saturating_mul(60 * 60))
	}
}

/// Longest retention or compaction threshold accepted, in days (100 years)
pub const MAX_DAY_COUNT: i64 = 36_500;

/// Configuration values that cannot be acted upon
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
	#[error("{field} must be greater than zero")]
	MustBePositive { field: &'static str },
	#[error("{field} must be -1 (disabled) or a non-negative number of days, got {value}")]
	InvalidDayCount { field: &'static str, value: i64 },
	#[error(
		"compaction.daily_to_weekly_threshold_days ({weekly}) must not be lower than compaction.hourly_to_daily_threshold_days ({daily})"
	)]
	CompactionThresholdOrder { daily: u32, weekly: u32 },
	#[error("{field} must be at most {max} days, got {value}")]
	DayCountTooLarge {
		field: &'static str,
		value: i64,
		max: i64,
	},
}

impl Settings {
	/// Check if running in production
	pub fn is_production(&self) -> bool {
		self.environment.profile == EnvironmentProfile::Production
	}

	/// Check if debug mode is enabled
	pub fn is_debug(&self) -> bool {
		self.environment.debug && !self.is_production()
	}

	/// Validate values that serde cannot express
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		let positive = [
			(
				"collection.flush_batch_size",
				self.collection.flush_batch_size as u64,
			),
			(
				"collection.flush_interval_seconds",
				self.collection.flush_interval_seconds,
			),
			(
				"compaction.interval_minutes",
				self.compaction.interval_minutes,
			),
			("compaction.batch_size", self.compaction.batch_size as u64),
			(
				"pruning.check_interval_hours",
				self.pruning.check_interval_hours,
			),
		];
		if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
			return Err(ConfigValidationError::MustBePositive { field });
		}

		if self.compaction.daily_to_weekly_threshold_days
			< self.compaction.hourly_to_daily_threshold_days
		{
			return Err(ConfigValidationError::CompactionThresholdOrder {
				daily: self.compaction.hourly_to_daily_threshold_days,
				weekly: self.compaction.daily_to_weekly_threshold_days,
			});
		}

		for (field, value) in [
			("pruning.max_age_days", self.pruning.max_age_days),
			("license.max_history_days", self.license.max_history_days),
		] {
			if value < -1 {
				return Err(ConfigValidationError::InvalidDayCount { field, value });
			}
		}

		for (field, value) in [
			(
				"compaction.hourly_to_daily_threshold_days",
				i64::from(self.compaction.hourly_to_daily_threshold_days),
			),
			(
				"compaction.daily_to_weekly_threshold_days",
				i64::from(self.compaction.daily_to_weekly_threshold_days),
			),
			("pruning.max_age_days", self.pruning.max_age_days),
		] {
			if value > MAX_DAY_COUNT {
				return Err(ConfigValidationError::DayCountTooLarge {
					field,
					value,
					max: MAX_DAY_COUNT,
				});
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		let settings = Settings::default();
		assert!(settings.validate().is_ok());
		assert_eq!(settings.collection.flush_interval(), Duration::from_secs(30));
		assert_eq!(settings.compaction.interval(), Duration::from_secs(3600));
		assert!(!settings.pruning.is_enabled());
		assert!(settings.leadership.is_leader);
	}

	#[test]
	fn test_zero_interval_is_rejected() {
		let mut settings = Settings::default();
		settings.compaction.interval_minutes = 0;
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::MustBePositive {
				field: "compaction.interval_minutes"
			})
		);
	}

	#[test]
	fn test_threshold_order_is_enforced() {
		let mut settings = Settings::default();
		settings.compaction.hourly_to_daily_threshold_days = 200;
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::CompactionThresholdOrder { .. })
		));
	}

	#[test]
	fn test_negative_day_counts_below_sentinel_are_rejected() {
		let mut settings = Settings::default();
		settings.pruning.max_age_days = -5;
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::InvalidDayCount { value: -5, .. })
		));
	}

	#[test]
	fn test_day_counts_beyond_a_century_are_rejected() {
		let mut settings = Settings::default();
		settings.pruning.max_age_days = 200_000_000;
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::DayCountTooLarge {
				field: "pruning.max_age_days",
				value: 200_000_000,
				max: MAX_DAY_COUNT,
			})
		);

		let mut settings = Settings::default();
		settings.compaction.hourly_to_daily_threshold_days = u32::MAX;
		settings.compaction.daily_to_weekly_threshold_days = u32::MAX;
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::DayCountTooLarge {
				field: "compaction.hourly_to_daily_threshold_days",
				..
			})
		));

		let mut settings = Settings::default();
		settings.pruning.max_age_days = MAX_DAY_COUNT;
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn test_huge_intervals_saturate() {
		let mut settings = Settings::default();
		settings.compaction.interval_minutes = u64::MAX;
		settings.pruning.check_interval_hours = u64::MAX;
		assert_eq!(settings.compaction.interval(), Duration::from_secs(u64::MAX));
		assert_eq!(settings.pruning.check_interval(), Duration::from_secs(u64::MAX));
	}

	#[test]
	fn test_partial_json_uses_section_defaults() {
		let settings: Settings =
			serde_json::from_str(r#"{"pruning": {"max_age_days": 30}}"#).unwrap();
		assert!(settings.pruning.is_enabled());
		assert_eq!(settings.pruning.check_interval_hours, 24);
		assert_eq!(settings.compaction.batch_size, 500);
	}
}
