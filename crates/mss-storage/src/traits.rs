//! The repository contract consumed by device-init reconciliation.

use async_trait::async_trait;
use mss_core::{App, Device, Version};

use crate::error::StorageError;
use crate::types::Lookup;

/// Storage operations needed to reconcile one init call.
///
/// Implementations must be thread-safe (`Send + Sync`) and must make both
/// upserts single atomic storage operations: the service runs as several
/// replicas, so no caller-side lock can protect a read-then-write sequence.
///
/// # Example
///
/// ```ignore
/// use mss_storage::{InitRepository, Lookup, StorageError};
///
/// async fn is_bound(repo: &dyn InitRepository, app_id: &str) -> Result<bool, StorageError> {
///     Ok(repo.get_app(app_id).await?.is_found())
/// }
/// ```
#[async_trait]
pub trait InitRepository: Send + Sync {
    // ==================== Apps ====================

    /// Looks up a bound app by its external app ID.
    ///
    /// Soft-deleted apps are reported as `Lookup::Absent`.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing apps.
    async fn get_app(&self, app_id: &str) -> Result<Lookup<App>, StorageError>;

    // ==================== Versions ====================

    /// Looks up the version row for `(app_id, version)`.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn get_version(&self, app_id: &str, version: &str)
    -> Result<Lookup<Version>, StorageError>;

    /// Records one launch of `version` in a single atomic operation.
    ///
    /// If no row exists for `(version.app_id, version.version)` the given row
    /// is inserted as-is (its `num_of_app_launches` is the initial count).
    /// Otherwise the stored `num_of_app_launches` is incremented by one. In both
    /// cases `last_launched_at` is set to a time strictly later than the stored
    /// one. Returns the row as stored after the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn upsert_version_launch(&self, version: &Version) -> Result<Version, StorageError>;

    // ==================== Devices ====================

    /// Looks up the device row for `(device_id, app_id)`.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn get_device(&self, device_id: &str, app_id: &str)
    -> Result<Lookup<Device>, StorageError>;

    /// Inserts `device` if no row exists for `(device.device_id, device.app_id)`,
    /// otherwise overwrites the stored version pointer, reported version and
    /// device version in a single atomic operation. The stored identity is kept.
    /// Returns the row as stored after the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn upsert_device(&self, device: &Device) -> Result<Device, StorageError>;

    // ==================== Metadata ====================

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve requests.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
