//! Queryable date ranges and their fixed day-count mapping

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::insights::{InsightsError, PeriodUnit};

/// Named date range a caller may query insights for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateRangeKey {
	#[serde(rename = "day")]
	Day,
	#[serde(rename = "week")]
	Week,
	#[serde(rename = "2weeks")]
	TwoWeeks,
	#[serde(rename = "month")]
	Month,
	#[serde(rename = "quarter")]
	Quarter,
	#[serde(rename = "6months")]
	SixMonths,
	#[serde(rename = "year")]
	Year,
}

impl DateRangeKey {
	pub const ALL: [DateRangeKey; 7] = [
		DateRangeKey::Day,
		DateRangeKey::Week,
		DateRangeKey::TwoWeeks,
		DateRangeKey::Month,
		DateRangeKey::Quarter,
		DateRangeKey::SixMonths,
		DateRangeKey::Year,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			DateRangeKey::Day => "day",
			DateRangeKey::Week => "week",
			DateRangeKey::TwoWeeks => "2weeks",
			DateRangeKey::Month => "month",
			DateRangeKey::Quarter => "quarter",
			DateRangeKey::SixMonths => "6months",
			DateRangeKey::Year => "year",
		}
	}

	/// Exact number of days covered by the range
	pub fn max_age_in_days(&self) -> u32 {
		match self {
			DateRangeKey::Day => 1,
			DateRangeKey::Week => 7,
			DateRangeKey::TwoWeeks => 14,
			DateRangeKey::Month => 30,
			DateRangeKey::Quarter => 90,
			DateRangeKey::SixMonths => 180,
			DateRangeKey::Year => 365,
		}
	}

	/// Bucket granularity used when charting this range
	pub fn granularity(&self) -> PeriodUnit {
		match self {
			DateRangeKey::Day => PeriodUnit::Hour,
			DateRangeKey::Week
			| DateRangeKey::TwoWeeks
			| DateRangeKey::Month
			| DateRangeKey::Quarter => PeriodUnit::Day,
			DateRangeKey::SixMonths | DateRangeKey::Year => PeriodUnit::Week,
		}
	}
}

impl fmt::Display for DateRangeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Accepts the canonical names (`quarter`) and day-count shorthands (`90d`)
impl FromStr for DateRangeKey {
	type Err = InsightsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let key = s.trim();
		DateRangeKey::ALL
			.into_iter()
			.find(|candidate| {
				candidate.as_str() == key || format!("{}d", candidate.max_age_in_days()) == key
			})
			.ok_or_else(|| InsightsError::invalid_argument(format!("unknown date range '{}'", s)))
	}
}

/// A date range as enumerated by the license policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeDescriptor {
	pub key: DateRangeKey,
	pub licensed: bool,
	pub granularity: PeriodUnit,
}

impl DateRangeDescriptor {
	pub fn new(key: DateRangeKey, licensed: bool) -> Self {
		Self {
			key,
			licensed,
			granularity: key.granularity(),
		}
	}
}

/// A licensed date range enriched with its exact age bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDateRange {
	pub key: DateRangeKey,
	pub licensed: bool,
	pub granularity: PeriodUnit,
	pub max_age_in_days: u32,
}

impl From<DateRangeDescriptor> for ResolvedDateRange {
	fn from(descriptor: DateRangeDescriptor) -> Self {
		Self {
			max_age_in_days: descriptor.key.max_age_in_days(),
			key: descriptor.key,
			licensed: descriptor.licensed,
			granularity: descriptor.granularity,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::insights::InsightsErrorKind;

	#[test]
	fn test_parse_canonical_and_shorthand_keys() {
		assert_eq!("quarter".parse::<DateRangeKey>().unwrap(), DateRangeKey::Quarter);
		assert_eq!("90d".parse::<DateRangeKey>().unwrap(), DateRangeKey::Quarter);
		assert_eq!("2weeks".parse::<DateRangeKey>().unwrap(), DateRangeKey::TwoWeeks);
		assert_eq!("365d".parse::<DateRangeKey>().unwrap(), DateRangeKey::Year);
	}

	#[test]
	fn test_parse_unknown_key() {
		let err = "forever".parse::<DateRangeKey>().unwrap_err();
		assert_eq!(err.kind(), InsightsErrorKind::InvalidArgument);
	}

	#[test]
	fn test_granularity_mapping() {
		assert_eq!(DateRangeKey::Day.granularity(), PeriodUnit::Hour);
		assert_eq!(DateRangeKey::Quarter.granularity(), PeriodUnit::Day);
		assert_eq!(DateRangeKey::Year.granularity(), PeriodUnit::Week);
	}

	#[test]
	fn test_resolved_range_carries_day_count() {
		let resolved = ResolvedDateRange::from(DateRangeDescriptor::new(DateRangeKey::Month, true));
		assert_eq!(resolved.max_age_in_days, 30);
		assert_eq!(resolved.granularity, PeriodUnit::Day);

		let json = serde_json::to_value(&resolved).unwrap();
		assert_eq!(json["key"], "month");
		assert_eq!(json["maxAgeInDays"], 30);
	}
}
