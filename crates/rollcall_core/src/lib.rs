//! Check-in engine: identity resolution plus day-scoped, race-safe,
//! idempotent attendance recording.
//! This crate is the single source of truth for the one-record-per-person-
//! per-day invariant.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ClockPolicy, FixedClock, SystemClock};
pub use config::{ConfigError, RollcallConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::attendance::{format_time_12h, AttendanceRecord, RecordId};
pub use model::person::{normalize_token, Person};
pub use repo::attendance_ledger::{AttendanceLedger, RecordAttempt, SqliteAttendanceLedger};
pub use repo::identity_store::{IdentityStore, SqliteIdentityStore};
pub use repo::report::{attendance_for_date, DayReportRow, MISSING_FIELD};
pub use repo::{RepoError, RepoResult};
pub use service::check_in_service::{
    CheckInFailure, CheckInOutcome, CheckInService, FailureStage,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
