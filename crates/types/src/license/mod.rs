//! License policy contract consulted by date-range resolution

use crate::date_ranges::DateRangeDescriptor;

/// Answers which historical ranges the current license tier may query.
///
/// Implementations are consulted synchronously and must not perform network calls.
pub trait LicensePolicy: Send + Sync {
	/// Every date range the service knows about, flagged as licensed or not
	fn available_date_ranges(&self) -> Vec<DateRangeDescriptor>;
}
