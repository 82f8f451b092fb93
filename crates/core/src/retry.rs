//! Same-day retry limiting for failed tier attempts.
//!
//! The limiter is advisory friction, not enforcement: it takes an injected
//! "today" and a persisted record, so it needs neither wall clock nor
//! storage to be exercised.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Failed-retry attempts allowed per calendar day.
pub const MAX_RETRIES_PER_DAY: u32 = 1;

/// Persisted per-device retry counter. A prior day's record is implicitly
/// reset by `record_retry` overwriting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryRecord {
    pub date: NaiveDate,
    pub count: u32,
}

/// True unless the record shows today's retry budget is already spent.
#[must_use]
pub fn can_retry_today(record: Option<&RetryRecord>, today: NaiveDate) -> bool {
    match record {
        Some(r) => r.date != today || r.count < MAX_RETRIES_PER_DAY,
        None => true,
    }
}

/// Consumes today's retry budget, overwriting any prior day's record.
#[must_use]
pub fn record_retry(today: NaiveDate) -> RetryRecord {
    RetryRecord {
        date: today,
        count: MAX_RETRIES_PER_DAY,
    }
}
