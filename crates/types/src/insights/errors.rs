//! Error types for insights read operations

use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Discriminant callers can branch on without matching error payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightsErrorKind {
	InvalidArgument,
	NotFound,
	LicenseExceeded,
	Storage,
}

/// Insights operation errors
///
/// The first three variants are deterministic input or policy failures and
/// must not be retried.
#[derive(Error, Debug)]
pub enum InsightsError {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },

	#[error("Date range not found: {key}")]
	NotFound { key: String },

	#[error("Date range '{key}' exceeds the current license")]
	LicenseExceeded { key: String },

	#[error("Storage error: {0}")]
	Storage(String),
}

impl InsightsError {
	pub fn invalid_argument(message: impl Into<String>) -> Self {
		InsightsError::InvalidArgument {
			message: message.into(),
		}
	}

	pub fn kind(&self) -> InsightsErrorKind {
		match self {
			InsightsError::InvalidArgument { .. } => InsightsErrorKind::InvalidArgument,
			InsightsError::NotFound { .. } => InsightsErrorKind::NotFound,
			InsightsError::LicenseExceeded { .. } => InsightsErrorKind::LicenseExceeded,
			InsightsError::Storage(_) => InsightsErrorKind::Storage,
		}
	}
}

impl From<StorageError> for InsightsError {
	fn from(err: StorageError) -> Self {
		InsightsError::Storage(err.to_string())
	}
}

pub type InsightsResult<T> = Result<T, InsightsError>;
