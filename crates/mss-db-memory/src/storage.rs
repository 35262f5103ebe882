use crate::stats::{StorageStats, StorageStatsSnapshot};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mss_core::{App, Device, Version, monotonic_after, now_utc};
use mss_storage::StorageError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Key of a version row: `(app_id, version)`.
pub type VersionKey = (String, String);

/// Key of a device row: `(device_id, app_id)`.
pub type DeviceKey = (String, String);

pub(crate) fn version_key(app_id: &str, version: &str) -> VersionKey {
    (app_id.to_string(), version.to_string())
}

pub(crate) fn device_key(device_id: &str, app_id: &str) -> DeviceKey {
    (device_id.to_string(), app_id.to_string())
}

/// In-memory storage backend using dashmap.
///
/// This storage implementation provides:
/// - Sharded concurrent access via dashmap
/// - Atomic launch upserts and device upserts (entry-locked per key)
/// - Soft-deleted apps hidden from lookups
/// - Write counters for instrumentation
/// - Fault injection for exercising failure paths
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// Apps keyed by external app ID, including soft-deleted ones
    pub(crate) apps: DashMap<String, App>,
    pub(crate) versions: DashMap<VersionKey, Version>,
    pub(crate) devices: DashMap<DeviceKey, Device>,
    stats: StorageStats,
    fail_app_reads: AtomicBool,
    fail_device_reads: AtomicBool,
    fail_version_writes: AtomicBool,
    fail_device_writes: AtomicBool,
    /// Artificial latency added before each write, in milliseconds
    write_delay_ms: AtomicU64,
}

impl InMemoryStorage {
    /// Creates a new, empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an app, or re-activates it if it was soft-deleted.
    pub fn bind_app(&self, app_id: &str, app_name: &str) -> App {
        match self.apps.entry(app_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let app = entry.get_mut();
                app.deleted_at = None;
                app.clone()
            }
            Entry::Vacant(entry) => {
                let app = App::new(app_id, app_name);
                entry.insert(app.clone());
                app
            }
        }
    }

    /// Soft-deletes an app. Its versions and devices are kept.
    pub fn unbind_app(&self, app_id: &str) -> Result<(), StorageError> {
        let mut app = self
            .apps
            .get_mut(app_id)
            .ok_or_else(|| StorageError::not_found("app", app_id))?;
        app.deleted_at = Some(now_utc());
        Ok(())
    }

    /// Sets the disabled flag of a stored version.
    pub fn set_version_disabled(
        &self,
        app_id: &str,
        version: &str,
        disabled: bool,
        message: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut row = self
            .versions
            .get_mut(&version_key(app_id, version))
            .ok_or_else(|| StorageError::not_found("version", format!("{app_id}/{version}")))?;
        row.disabled = disabled;
        row.disabled_message = message.map(str::to_string);
        Ok(())
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn stats(&self) -> StorageStatsSnapshot {
        self.stats.snapshot()
    }

    /// Makes every following app lookup through `InitRepository` fail.
    pub fn set_fail_app_reads(&self, fail: bool) {
        self.fail_app_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every following device lookup through `InitRepository` fail.
    pub fn set_fail_device_reads(&self, fail: bool) {
        self.fail_device_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn app_reads_fail(&self) -> bool {
        self.fail_app_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn device_reads_fail(&self) -> bool {
        self.fail_device_reads.load(Ordering::SeqCst)
    }

    /// Makes every following version write fail with an internal error.
    pub fn set_fail_version_writes(&self, fail: bool) {
        self.fail_version_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following device write fail with an internal error.
    pub fn set_fail_device_writes(&self, fail: bool) {
        self.fail_device_writes.store(fail, Ordering::SeqCst);
    }

    /// Delays every following write by `delay`.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    pub async fn get_app(&self, app_id: &str) -> Option<App> {
        self.apps
            .get(app_id)
            .filter(|app| app.is_active())
            .map(|app| app.clone())
    }

    pub async fn get_version(&self, app_id: &str, version: &str) -> Option<Version> {
        self.versions
            .get(&version_key(app_id, version))
            .map(|row| row.clone())
    }

    pub async fn get_device(&self, device_id: &str, app_id: &str) -> Option<Device> {
        self.devices
            .get(&device_key(device_id, app_id))
            .map(|row| row.clone())
    }

    pub async fn upsert_version_launch(&self, version: &Version) -> Result<Version, StorageError> {
        self.simulate_latency().await;
        if self.fail_version_writes.load(Ordering::SeqCst) {
            return Err(StorageError::internal("injected version write failure"));
        }

        // The entry guard is held for the whole read-modify-write
        let stored = match self
            .versions
            .entry(version_key(&version.app_id, &version.version))
        {
            Entry::Occupied(mut entry) => {
                let row = entry.get_mut();
                row.num_of_app_launches += 1;
                row.last_launched_at = Some(monotonic_after(row.last_launched_at));
                self.stats.record_version_update();
                row.clone()
            }
            Entry::Vacant(entry) => {
                let mut row = version.clone();
                row.last_launched_at = Some(monotonic_after(row.last_launched_at));
                entry.insert(row.clone());
                self.stats.record_version_insert();
                row
            }
        };

        tracing::trace!(
            app_id = %stored.app_id,
            version = %stored.version,
            launches = stored.num_of_app_launches,
            "version launch recorded"
        );

        Ok(stored)
    }

    pub async fn upsert_device(&self, device: &Device) -> Result<Device, StorageError> {
        self.simulate_latency().await;
        if self.fail_device_writes.load(Ordering::SeqCst) {
            return Err(StorageError::internal("injected device write failure"));
        }

        let stored = match self
            .devices
            .entry(device_key(&device.device_id, &device.app_id))
        {
            Entry::Occupied(mut entry) => {
                let row = entry.get_mut();
                row.version_id = device.version_id.clone();
                row.version = device.version.clone();
                row.device_version = device.device_version.clone();
                self.stats.record_device_update();
                row.clone()
            }
            Entry::Vacant(entry) => {
                entry.insert(device.clone());
                self.stats.record_device_insert();
                device.clone()
            }
        };

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mss_core::DeviceSnapshot;
    use std::sync::Arc;

    fn snapshot(device_id: &str, device_version: &str) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: device_id.into(),
            app_id: "com.example.app".into(),
            version: "1.0".into(),
            device_version: device_version.into(),
            device_type: "iOS".into(),
        }
    }

    fn first_launch(app_id: &str, version: &str) -> Version {
        let mut v = Version::new(app_id, version);
        v.num_of_app_launches = 1;
        v
    }

    #[tokio::test]
    async fn test_bind_and_unbind_app() {
        let storage = InMemoryStorage::new();
        let bound = storage.bind_app("com.example.app", "Example");
        assert!(bound.is_active());
        assert_eq!(storage.get_app("com.example.app").await, Some(bound.clone()));

        storage.unbind_app("com.example.app").unwrap();
        assert_eq!(storage.get_app("com.example.app").await, None);

        // Rebinding keeps the surrogate key
        let rebound = storage.bind_app("com.example.app", "Example");
        assert_eq!(rebound.id, bound.id);
        assert!(storage.get_app("com.example.app").await.is_some());

        let err = storage.unbind_app("com.unknown").unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_version_upsert_inserts_then_increments() {
        let storage = InMemoryStorage::new();

        let inserted = storage
            .upsert_version_launch(&first_launch("com.example.app", "1.0"))
            .await
            .unwrap();
        assert_eq!(inserted.num_of_app_launches, 1);
        assert!(inserted.last_launched_at.is_some());

        // A stale candidate still increments relative to the stored count
        let updated = storage
            .upsert_version_launch(&first_launch("com.example.app", "1.0"))
            .await
            .unwrap();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.num_of_app_launches, 2);
        assert!(updated.last_launched_at > inserted.last_launched_at);

        assert_eq!(storage.version_count(), 1);
        let stats = storage.stats();
        assert_eq!(stats.version_inserts, 1);
        assert_eq!(stats.version_updates, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_version_upserts_do_not_lose_updates() {
        let storage = Arc::new(InMemoryStorage::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage
                        .upsert_version_launch(&first_launch("com.example.app", "2.0"))
                        .await
                })
            })
            .collect();
        for result in futures_util::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(storage.version_count(), 1);
        let row = storage.get_version("com.example.app", "2.0").await.unwrap();
        assert_eq!(row.num_of_app_launches, 32);
    }

    #[tokio::test]
    async fn test_device_upsert_keeps_identity() {
        let storage = InMemoryStorage::new();
        let v1 = first_launch("com.example.app", "1.0");
        let v2 = first_launch("com.example.app", "1.1");

        let created = storage
            .upsert_device(&Device::new(&snapshot("d1", "14"), &v1))
            .await
            .unwrap();

        // A second candidate with a fresh identity updates the existing row
        let moved = storage
            .upsert_device(&Device::new(&snapshot("d1", "15"), &v2))
            .await
            .unwrap();
        assert_eq!(moved.id, created.id);
        assert_eq!(moved.version_id, v2.id);
        assert_eq!(moved.version, "1.1");
        assert_eq!(moved.device_version, "15");
        assert_eq!(storage.device_count(), 1);
        assert_eq!(storage.stats().device_writes(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let storage = InMemoryStorage::new();
        storage.set_fail_version_writes(true);
        assert!(
            storage
                .upsert_version_launch(&first_launch("com.example.app", "1.0"))
                .await
                .is_err()
        );
        assert_eq!(storage.version_count(), 0);

        storage.set_fail_device_writes(true);
        let v = Version::new("com.example.app", "1.0");
        assert!(
            storage
                .upsert_device(&Device::new(&snapshot("d1", "14"), &v))
                .await
                .is_err()
        );
        assert_eq!(storage.device_count(), 0);
    }

    #[tokio::test]
    async fn test_set_version_disabled() {
        let storage = InMemoryStorage::new();
        storage
            .upsert_version_launch(&first_launch("com.example.app", "1.0"))
            .await
            .unwrap();
        storage
            .set_version_disabled("com.example.app", "1.0", true, Some("Update required"))
            .unwrap();

        let row = storage.get_version("com.example.app", "1.0").await.unwrap();
        assert!(row.disabled);
        assert_eq!(row.disabled_message.as_deref(), Some("Update required"));

        assert!(
            storage
                .set_version_disabled("com.example.app", "9.9", true, None)
                .is_err()
        );
    }
}
