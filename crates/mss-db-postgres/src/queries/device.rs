//! Queries against the `device` table.

use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::instrument;

use mss_core::Device;
use mss_storage::StorageError;

use crate::error::storage_error;

type DeviceRow = (String, String, String, String, String, String, String);

fn into_device(row: DeviceRow) -> Device {
    Device {
        id: row.0,
        version_id: row.1,
        version: row.2,
        app_id: row.3,
        device_id: row.4,
        device_type: row.5,
        device_version: row.6,
    }
}

/// Reads the device row for `(device_id, app_id)`.
#[instrument(skip(pool))]
pub async fn get(
    pool: &PgPool,
    device_id: &str,
    app_id: &str,
) -> Result<Option<Device>, StorageError> {
    let row: Option<DeviceRow> = query_as(
        r#"SELECT id, version_id, version, app_id, device_id, device_type, device_version
           FROM device
           WHERE device_id = $1 AND app_id = $2"#,
    )
    .bind(device_id)
    .bind(app_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| storage_error("Failed to read device", e))?;

    Ok(row.map(into_device))
}

/// Inserts `device` or moves the stored row to the candidate's version pointer
/// and device version, in one statement. The stored `id` survives a conflict.
#[instrument(skip(pool, device), fields(device_id = %device.device_id, app_id = %device.app_id))]
pub async fn upsert(pool: &PgPool, device: &Device) -> Result<Device, StorageError> {
    let row: DeviceRow = query_as(
        r#"INSERT INTO device
               (id, version_id, version, app_id, device_id, device_type, device_version)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (device_id, app_id) DO UPDATE
           SET version_id = EXCLUDED.version_id,
               version = EXCLUDED.version,
               device_version = EXCLUDED.device_version
           RETURNING id, version_id, version, app_id, device_id, device_type, device_version"#,
    )
    .bind(&device.id)
    .bind(&device.version_id)
    .bind(&device.version)
    .bind(&device.app_id)
    .bind(&device.device_id)
    .bind(&device.device_type)
    .bind(&device.device_version)
    .fetch_one(pool)
    .await
    .map_err(|e| storage_error("Failed to upsert device", e))?;

    Ok(into_device(row))
}
