//! Request-level API for scanning stations.
//!
//! # Responsibility
//! - Extract the token from a scanner payload.
//! - Render check-in outcomes and day reports as stable JSON envelopes.
//!
//! # Invariants
//! - Every call returns an envelope; failures never escape as panics.
//! - Envelope `status` mirrors the HTTP status a web front-end would send.

use chrono::NaiveDate;
use rollcall_core::db::open_db;
use rollcall_core::{
    attendance_for_date, CheckInOutcome, CheckInService, Clock, DayReportRow, Person,
    SqliteAttendanceLedger, SqliteIdentityStore,
};
use serde::Serialize;
use std::path::Path;

const SCAN_PAYLOAD_KEY: &str = "idno";

/// Response envelope for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResponse {
    /// Whether the person is checked in for today.
    pub success: bool,
    /// HTTP-style status: 200, 400, 404 or 500.
    pub status: u16,
    /// Outcome label (`recorded`, `already_recorded`, `unresolved`, `failed`).
    pub outcome: &'static str,
    /// Resolved person, when known.
    pub person: Option<Person>,
    /// Human-readable message for the scanning station.
    pub message: String,
}

impl From<&CheckInOutcome> for ScanResponse {
    fn from(outcome: &CheckInOutcome) -> Self {
        let status = match outcome {
            CheckInOutcome::Recorded { .. } | CheckInOutcome::AlreadyRecorded { .. } => 200,
            CheckInOutcome::Unresolved { token } if token.is_empty() => 400,
            CheckInOutcome::Unresolved { .. } => 404,
            CheckInOutcome::Failed(_) => 500,
        };
        Self {
            success: outcome.is_success(),
            status,
            outcome: outcome.status(),
            person: outcome.person().cloned(),
            message: outcome.message(),
        }
    }
}

impl ScanResponse {
    fn storage_unavailable(message: String) -> Self {
        Self {
            success: false,
            status: 500,
            outcome: "failed",
            person: None,
            message,
        }
    }
}

/// Response envelope for one day's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportResponse {
    pub ok: bool,
    pub date: NaiveDate,
    pub records: Vec<DayReportRow>,
    pub message: String,
}

/// Extracts the token from a scanner payload.
///
/// Accepts a JSON object `{"idno": "..."}` or the bare decoded token. Anything
/// else that parses as JSON is treated as a bare token string.
pub fn parse_scan_payload(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => match map.get(SCAN_PAYLOAD_KEY) {
            Some(serde_json::Value::String(token)) => token.clone(),
            Some(serde_json::Value::Number(number)) => number.to_string(),
            _ => String::new(),
        },
        _ => raw.to_string(),
    }
}

/// Runs one check-in against the database at `db_path`.
pub fn scan(db_path: &Path, payload: &str, clock: impl Clock) -> ScanResponse {
    let conn = match open_db(db_path) {
        Ok(conn) => conn,
        Err(err) => return ScanResponse::storage_unavailable(format!("scan failed: {err}")),
    };
    let identities = match SqliteIdentityStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => return ScanResponse::storage_unavailable(format!("scan failed: {err}")),
    };
    let ledger = match SqliteAttendanceLedger::try_new(&conn) {
        Ok(ledger) => ledger,
        Err(err) => return ScanResponse::storage_unavailable(format!("scan failed: {err}")),
    };

    let service = CheckInService::new(identities, ledger, clock);
    let outcome = service.check_in(&parse_scan_payload(payload));
    ScanResponse::from(&outcome)
}

/// Lists attendance for `date`, or for today when `date` is missing or invalid.
pub fn report(db_path: &Path, date: Option<&str>, clock: impl Clock) -> ReportResponse {
    let date = date
        .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| clock.today());

    let records = open_db(db_path)
        .map_err(|err| err.to_string())
        .and_then(|conn| attendance_for_date(&conn, date).map_err(|err| err.to_string()));

    match records {
        Ok(records) => ReportResponse {
            ok: true,
            date,
            message: format!("{} record(s)", records.len()),
            records,
        },
        Err(err) => ReportResponse {
            ok: false,
            date,
            records: Vec::new(),
            message: format!("report failed: {err}"),
        },
    }
}
