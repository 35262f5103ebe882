//! SQL query implementations for the reconciliation tables.
//!
//! - [`app`]: App lookup (soft-delete filtered) and binding
//! - [`version`]: Version lookup and the launch-counting upsert
//! - [`device`]: Device lookup and upsert

pub mod app;
pub mod device;
pub mod version;

use chrono::{DateTime, Utc};
use time::OffsetDateTime;

/// Converts chrono DateTime to time OffsetDateTime.
pub(crate) fn chrono_to_time(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::nanoseconds(dt.timestamp_subsec_nanos() as i64)
}
