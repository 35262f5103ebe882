//! Queries against the `app` table.

use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::instrument;

use mss_core::{App, generate_id};
use mss_storage::StorageError;

use super::chrono_to_time;
use crate::error::storage_error;

type AppRow = (String, String, String, Option<DateTime<Utc>>);

fn into_app(row: AppRow) -> App {
    App {
        id: row.0,
        app_id: row.1,
        app_name: row.2,
        deleted_at: row.3.map(chrono_to_time),
    }
}

/// Reads a bound app by its external app ID.
///
/// Returns `None` for unknown and for soft-deleted apps alike.
#[instrument(skip(pool))]
pub async fn get_active(pool: &PgPool, app_id: &str) -> Result<Option<App>, StorageError> {
    let row: Option<AppRow> = query_as(
        r#"SELECT id, app_id, app_name, deleted_at
           FROM app
           WHERE app_id = $1 AND deleted_at IS NULL"#,
    )
    .bind(app_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| storage_error("Failed to read app", e))?;

    Ok(row.map(into_app))
}

/// Binds an app, re-activating it if it was soft-deleted.
#[instrument(skip(pool))]
pub async fn bind(pool: &PgPool, app_id: &str, app_name: &str) -> Result<App, StorageError> {
    let row: AppRow = query_as(
        r#"INSERT INTO app (id, app_id, app_name)
           VALUES ($1, $2, $3)
           ON CONFLICT (app_id) DO UPDATE SET deleted_at = NULL
           RETURNING id, app_id, app_name, deleted_at"#,
    )
    .bind(generate_id())
    .bind(app_id)
    .bind(app_name)
    .fetch_one(pool)
    .await
    .map_err(|e| storage_error("Failed to bind app", e))?;

    Ok(into_app(row))
}

/// Soft-deletes a bound app.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no bound app has this ID.
#[instrument(skip(pool))]
pub async fn unbind(pool: &PgPool, app_id: &str) -> Result<(), StorageError> {
    let result = query("UPDATE app SET deleted_at = NOW() WHERE app_id = $1 AND deleted_at IS NULL")
        .bind(app_id)
        .execute(pool)
        .await
        .map_err(|e| storage_error("Failed to unbind app", e))?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("app", app_id));
    }
    Ok(())
}
