//! Write counters for the in-memory backend.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts every write the backend performs, split by table and kind.
#[derive(Debug, Default)]
pub struct StorageStats {
    version_inserts: AtomicU64,
    version_updates: AtomicU64,
    device_inserts: AtomicU64,
    device_updates: AtomicU64,
}

/// Point-in-time copy of [`StorageStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStatsSnapshot {
    pub version_inserts: u64,
    pub version_updates: u64,
    pub device_inserts: u64,
    pub device_updates: u64,
}

impl StorageStatsSnapshot {
    pub fn version_writes(&self) -> u64 {
        self.version_inserts + self.version_updates
    }

    pub fn device_writes(&self) -> u64 {
        self.device_inserts + self.device_updates
    }
}

impl StorageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_version_insert(&self) {
        self.version_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_version_update(&self) {
        self.version_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_device_insert(&self) {
        self.device_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_device_update(&self) {
        self.device_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StorageStatsSnapshot {
        StorageStatsSnapshot {
            version_inserts: self.version_inserts.load(Ordering::Relaxed),
            version_updates: self.version_updates.load(Ordering::Relaxed),
            device_inserts: self.device_inserts.load(Ordering::Relaxed),
            device_updates: self.device_updates.load(Ordering::Relaxed),
        }
    }
}
