//! License tier policy backed by configuration

use insights_config::LicenseSettings;
use insights_types::{DateRangeDescriptor, DateRangeKey, LicensePolicy};

/// Sentinel for an unlimited history quota
pub const UNLIMITED_HISTORY: i64 = -1;

/// Licenses date ranges from two tier flags.
///
/// `day` is hour-granular and licensed only when hourly data is enabled. Every
/// other range is licensed when it fits inside the history quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLicensePolicy {
	max_history_days: i64,
	hourly_data_enabled: bool,
}

impl TierLicensePolicy {
	pub fn new(max_history_days: i64, hourly_data_enabled: bool) -> Self {
		Self {
			max_history_days,
			hourly_data_enabled,
		}
	}

	pub fn from_settings(settings: &LicenseSettings) -> Self {
		Self::new(settings.max_history_days, settings.hourly_data_enabled)
	}

	pub fn is_licensed(&self, key: DateRangeKey) -> bool {
		match key {
			DateRangeKey::Day => self.hourly_data_enabled,
			other => {
				self.max_history_days == UNLIMITED_HISTORY
					|| i64::from(other.max_age_in_days()) <= self.max_history_days
			},
		}
	}
}

impl From<&LicenseSettings> for TierLicensePolicy {
	fn from(settings: &LicenseSettings) -> Self {
		Self::from_settings(settings)
	}
}

impl LicensePolicy for TierLicensePolicy {
	fn available_date_ranges(&self) -> Vec<DateRangeDescriptor> {
		DateRangeKey::ALL
			.into_iter()
			.map(|key| DateRangeDescriptor::new(key, self.is_licensed(key)))
			.collect()
	}
}
