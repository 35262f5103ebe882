//! Queries against the `version` table.

use chrono::{DateTime, Utc};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::instrument;

use mss_core::Version;
use mss_storage::StorageError;

use super::chrono_to_time;
use crate::error::storage_error;

type VersionRow = (
    String,
    String,
    String,
    bool,
    Option<String>,
    i64,
    i64,
    Option<DateTime<Utc>>,
);

fn into_version(row: VersionRow) -> Version {
    Version {
        id: row.0,
        version: row.1,
        app_id: row.2,
        disabled: row.3,
        disabled_message: row.4,
        num_of_current_installs: row.5,
        num_of_app_launches: row.6,
        last_launched_at: row.7.map(chrono_to_time),
    }
}

/// Reads the version row for `(app_id, version)`.
#[instrument(skip(pool))]
pub async fn get(
    pool: &PgPool,
    app_id: &str,
    version: &str,
) -> Result<Option<Version>, StorageError> {
    let row: Option<VersionRow> = query_as(
        r#"SELECT id, version, app_id, disabled, disabled_message,
                  num_of_current_installs, num_of_app_launches, last_launched_at
           FROM version
           WHERE app_id = $1 AND version = $2"#,
    )
    .bind(app_id)
    .bind(version)
    .fetch_optional(pool)
    .await
    .map_err(|e| storage_error("Failed to read version", e))?;

    Ok(row.map(into_version))
}

/// Inserts `version` or increments the stored launch counter, in one statement.
///
/// On conflict only the counter and timestamp move; the disabled state and the
/// stored identity are left as they are. `GREATEST` keeps `last_launched_at`
/// strictly increasing when two launches land in the same transaction instant.
#[instrument(skip(pool, version), fields(app_id = %version.app_id, version = %version.version))]
pub async fn upsert_launch(pool: &PgPool, version: &Version) -> Result<Version, StorageError> {
    let row: VersionRow = query_as(
        r#"INSERT INTO version AS v
               (id, version, app_id, disabled, disabled_message,
                num_of_current_installs, num_of_app_launches, last_launched_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
           ON CONFLICT (app_id, version) DO UPDATE
           SET num_of_app_launches = v.num_of_app_launches + 1,
               last_launched_at = GREATEST(NOW(), v.last_launched_at + INTERVAL '1 microsecond')
           RETURNING id, version, app_id, disabled, disabled_message,
                     num_of_current_installs, num_of_app_launches, last_launched_at"#,
    )
    .bind(&version.id)
    .bind(&version.version)
    .bind(&version.app_id)
    .bind(version.disabled)
    .bind(&version.disabled_message)
    .bind(version.num_of_current_installs)
    .bind(version.num_of_app_launches)
    .fetch_one(pool)
    .await
    .map_err(|e| storage_error("Failed to record version launch", e))?;

    Ok(into_version(row))
}
