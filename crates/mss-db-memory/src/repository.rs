use async_trait::async_trait;

use crate::InMemoryStorage;
use mss_core::{App, Device, Version};
use mss_storage::{InitRepository, Lookup, StorageError};

// Implement InitRepository for InMemoryStorage by delegating to its methods.
#[async_trait]
impl InitRepository for InMemoryStorage {
    async fn get_app(&self, app_id: &str) -> Result<Lookup<App>, StorageError> {
        if self.app_reads_fail() {
            return Err(StorageError::internal("injected app read failure"));
        }
        Ok(InMemoryStorage::get_app(self, app_id).await.into())
    }

    async fn get_version(
        &self,
        app_id: &str,
        version: &str,
    ) -> Result<Lookup<Version>, StorageError> {
        Ok(InMemoryStorage::get_version(self, app_id, version)
            .await
            .into())
    }

    async fn upsert_version_launch(&self, version: &Version) -> Result<Version, StorageError> {
        InMemoryStorage::upsert_version_launch(self, version).await
    }

    async fn get_device(
        &self,
        device_id: &str,
        app_id: &str,
    ) -> Result<Lookup<Device>, StorageError> {
        if self.device_reads_fail() {
            return Err(StorageError::internal("injected device read failure"));
        }
        Ok(InMemoryStorage::get_device(self, device_id, app_id)
            .await
            .into())
    }

    async fn upsert_device(&self, device: &Device) -> Result<Device, StorageError> {
        InMemoryStorage::upsert_device(self, device).await
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trait_object_hides_soft_deleted_apps() {
        let storage = InMemoryStorage::new();
        storage.bind_app("com.example.app", "Example");
        let repo: &dyn InitRepository = &storage;

        assert!(repo.get_app("com.example.app").await.unwrap().is_found());
        assert!(repo.get_app("com.other.app").await.unwrap().is_absent());

        storage.unbind_app("com.example.app").unwrap();
        assert!(repo.get_app("com.example.app").await.unwrap().is_absent());
        assert_eq!(repo.backend_name(), "memory");
        assert!(repo.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_read_failures() {
        let storage = InMemoryStorage::new();
        storage.bind_app("com.example.app", "Example");
        let repo: &dyn InitRepository = &storage;

        storage.set_fail_app_reads(true);
        let err = repo.get_app("com.example.app").await.unwrap_err();
        assert!(!err.is_not_found());
        // Inherent lookups bypass the injected failure
        assert!(storage.get_app("com.example.app").await.is_some());

        storage.set_fail_app_reads(false);
        storage.set_fail_device_reads(true);
        assert!(repo.get_app("com.example.app").await.unwrap().is_found());
        assert!(repo.get_device("d1", "com.example.app").await.is_err());

        storage.set_fail_device_reads(false);
        assert!(repo.get_device("d1", "com.example.app").await.unwrap().is_absent());
    }
}
