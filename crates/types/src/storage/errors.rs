//! Error types for storage operations

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Connection error: {message}")]
	Connection { message: String },
	#[error("Invalid query: {message}")]
	InvalidQuery { message: String },
	#[error("Storage operation failed: {message}")]
	Operation { message: String },
}
