//! Timestamp and backoff utilities

use chrono::{DateTime, Duration, DurationRound, Utc};

/// Base delay before the first email retry
pub const BASE_RETRY_DELAY_MINUTES: i64 = 5;

/// Get current UTC timestamp, truncated to whole seconds
///
/// Stored timestamps are compared as text by some queries, so every
/// timestamp written by the services has the same precision.
pub fn now() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

/// Drop sub-second precision from a timestamp
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::seconds(1)).unwrap_or(ts)
}

/// Delay required after the `retry_count`-th failed attempt
///
/// `5 minutes * 2^retry_count`, saturating instead of overflowing for
/// large counts.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let factor = 1i64.checked_shl(retry_count).filter(|f| *f > 0);
    match factor.and_then(|f| BASE_RETRY_DELAY_MINUTES.checked_mul(f)) {
        Some(minutes) => Duration::try_minutes(minutes).unwrap_or(Duration::MAX),
        None => Duration::MAX,
    }
}

/// Whether enough wall-clock time has elapsed since `last_attempt`
pub fn is_due(last_attempt: DateTime<Utc>, retry_count: u32, now: DateTime<Utc>) -> bool {
    match last_attempt.checked_add_signed(backoff_delay(retry_count)) {
        Some(due_at) => now >= due_at,
        None => false,
    }
}
