//! PostgreSQL implementation of the InitRepository trait.

use async_trait::async_trait;
use sqlx_postgres::PgPool;

use mss_core::{App, Device, Version};
use mss_storage::{InitRepository, Lookup, StorageError};

use crate::config::PostgresConfig;
use crate::error::storage_error;
use crate::migrations;
use crate::pool;
use crate::queries;

/// PostgreSQL storage backend for apps, versions and devices.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a new `PostgresStorage` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresStorage` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Binds an app, or re-activates it if it was soft-deleted.
    pub async fn bind_app(&self, app_id: &str, app_name: &str) -> Result<App, StorageError> {
        queries::app::bind(&self.pool, app_id, app_name).await
    }

    /// Soft-deletes an app. Its versions and devices are kept.
    pub async fn unbind_app(&self, app_id: &str) -> Result<(), StorageError> {
        queries::app::unbind(&self.pool, app_id).await
    }
}

#[async_trait]
impl InitRepository for PostgresStorage {
    async fn get_app(&self, app_id: &str) -> Result<Lookup<App>, StorageError> {
        Ok(queries::app::get_active(&self.pool, app_id).await?.into())
    }

    async fn get_version(
        &self,
        app_id: &str,
        version: &str,
    ) -> Result<Lookup<Version>, StorageError> {
        Ok(queries::version::get(&self.pool, app_id, version)
            .await?
            .into())
    }

    async fn upsert_version_launch(&self, version: &Version) -> Result<Version, StorageError> {
        queries::version::upsert_launch(&self.pool, version).await
    }

    async fn get_device(
        &self,
        device_id: &str,
        app_id: &str,
    ) -> Result<Lookup<Device>, StorageError> {
        Ok(queries::device::get(&self.pool, device_id, app_id)
            .await?
            .into())
    }

    async fn upsert_device(&self, device: &Device) -> Result<Device, StorageError> {
        queries::device::upsert(&self.pool, device).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx_core::query::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Database ping failed", e))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
