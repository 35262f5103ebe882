//! In-memory storage backend for the mobile security service.
//!
//! This crate provides an in-memory implementation of the `InitRepository`
//! trait from `mss-storage`, using dashmap for concurrent access. Each upsert
//! runs under the entry lock of its key, which makes insert-or-increment and
//! insert-or-update atomic against concurrent callers.
//!
//! # Example
//!
//! ```ignore
//! use mss_db_memory::InMemoryStorage;
//! use mss_storage::InitRepository;
//!
//! let storage = InMemoryStorage::new();
//! storage.bind_app("com.example.app", "Example");
//!
//! let app = storage.get_app("com.example.app").await?;
//! assert!(app.is_found());
//! ```

mod repository;
pub mod stats;
pub mod storage;

// Re-export the repository trait for convenience
pub use mss_storage::{InitRepository, Lookup, StorageError};

pub use stats::{StorageStats, StorageStatsSnapshot};
pub use storage::{DeviceKey, InMemoryStorage, VersionKey};

/// Creates a new shareable in-memory repository.
pub fn create_repository() -> std::sync::Arc<InMemoryStorage> {
    std::sync::Arc::new(InMemoryStorage::new())
}
