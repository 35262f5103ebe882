use time::{Duration, OffsetDateTime};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Returns the current time, nudged forward so it is strictly later than
/// `previous`. Launch timestamps must keep increasing even when the wall clock
/// has not moved between two writes.
pub fn monotonic_after(previous: Option<OffsetDateTime>) -> OffsetDateTime {
    let now = now_utc();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
