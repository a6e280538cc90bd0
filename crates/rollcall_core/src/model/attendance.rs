//! Attendance record model.
//!
//! # Responsibility
//! - Define the immutable fact "this person was scanned on this day".
//! - Provide user-facing time formatting.
//!
//! # Invariants
//! - At most one record exists per `(person_token, date)`; enforced by the
//!   ledger's storage, not by this type.
//! - `id` grows monotonically with creation order.
//! - `time_in` has whole-second precision.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Storage-assigned record id; doubles as creation order.
pub type RecordId = i64;

/// One person's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub person_token: String,
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    /// Storage insertion time, epoch milliseconds.
    pub created_at_ms: i64,
}

/// Formats a time-of-day as `8:05 AM`: 12-hour clock, no leading zero.
pub fn format_time_12h(time: NaiveTime) -> String {
    let formatted = time.format("%I:%M %p").to_string();
    match formatted.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => formatted,
    }
}
