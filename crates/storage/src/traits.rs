//! Storage traits for pluggable storage implementations

// Re-export the storage traits from types crate
pub use insights_types::storage::{
	InsightsMaintenanceStorageTrait as MaintenanceStorage,
	InsightsQueryStorageTrait as QueryStorage, InsightsRawStorageTrait as RawStorage,
	StorageError, StorageResult, StorageStats, StorageTrait as Storage,
};
