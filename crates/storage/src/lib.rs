//! Insights Storage
//!
//! Storage implementations for the insights aggregator. Ships an in-memory
//! backend; other backends implement the traits from `insights_types`.

pub mod memory_store;
pub mod traits;

pub use memory_store::MemoryStore;
pub use traits::Storage;
