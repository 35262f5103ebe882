use mss_core::{Device, DeviceSnapshot, Version};
use mss_storage::{DynRepository, Lookup, StorageError};
use tokio::time::Instant;

use super::{InitError, InitStage, within_deadline};

/// Differences between a stored device and what the client just reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceChanges {
    pub version_changed: bool,
    pub device_version_changed: bool,
}

impl DeviceChanges {
    pub fn between(stored: &Device, snapshot: &DeviceSnapshot, version: &Version) -> Self {
        Self {
            version_changed: stored.version_id != version.id,
            device_version_changed: stored.device_version != snapshot.device_version,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.version_changed || self.device_version_changed
    }
}

/// What device reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    Created(Device),
    Updated(Device, DeviceChanges),
    Unchanged(Device),
}

impl DeviceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(..) => "updated",
            Self::Unchanged(_) => "unchanged",
        }
    }
}

/// Keeps the device row of a client in line with its latest report.
#[derive(Clone)]
pub struct DeviceReconciler {
    repo: DynRepository,
}

impl DeviceReconciler {
    pub fn new(repo: DynRepository) -> Self {
        Self { repo }
    }

    /// Creates the device on first sight, updates it in place when the version
    /// pointer or the device OS version moved, and skips the write otherwise.
    pub async fn reconcile(
        &self,
        snapshot: &DeviceSnapshot,
        version: &Version,
        deadline: Instant,
    ) -> Result<DeviceOutcome, InitError> {
        let fail =
            |source: StorageError| InitError::internal(InitStage::ReconcilingDevice, source);

        let existing = within_deadline(
            deadline,
            "get_device",
            self.repo.get_device(&snapshot.device_id, &snapshot.app_id),
        )
        .await
        .map_err(fail)?;

        let (candidate, changes) = match existing {
            Lookup::Absent => (Device::new(snapshot, version), None),
            Lookup::Found(stored) => {
                let changes = DeviceChanges::between(&stored, snapshot, version);
                if !changes.is_dirty() {
                    return Ok(DeviceOutcome::Unchanged(stored));
                }
                let mut updated = stored;
                updated.version_id = version.id.clone();
                updated.version = version.version.clone();
                updated.device_version = snapshot.device_version.clone();
                (updated, Some(changes))
            }
        };

        // A concurrent first call may have inserted the row since the lookup;
        // the upsert turns that into an update instead of a duplicate.
        let stored = within_deadline(
            deadline,
            "upsert_device",
            self.repo.upsert_device(&candidate),
        )
        .await
        .map_err(fail)?;

        Ok(match changes {
            None => DeviceOutcome::Created(stored),
            Some(changes) => DeviceOutcome::Updated(stored, changes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(device_version: &str) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: "d1".into(),
            app_id: "com.example.app".into(),
            version: "1.0".into(),
            device_version: device_version.into(),
            device_type: "Android".into(),
        }
    }

    #[test]
    fn changes_track_version_and_os_version() {
        let v1 = Version::new("com.example.app", "1.0");
        let v2 = Version::new("com.example.app", "1.1");
        let stored = Device::new(&snapshot("14"), &v1);

        assert!(!DeviceChanges::between(&stored, &snapshot("14"), &v1).is_dirty());

        let moved = DeviceChanges::between(&stored, &snapshot("14"), &v2);
        assert!(moved.version_changed);
        assert!(!moved.device_version_changed);

        let upgraded = DeviceChanges::between(&stored, &snapshot("15"), &v1);
        assert!(!upgraded.version_changed);
        assert!(upgraded.device_version_changed);
        assert!(upgraded.is_dirty());
    }
}
