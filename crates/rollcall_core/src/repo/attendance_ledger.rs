//! Attendance ledger contract and SQLite implementation.
//!
//! # Responsibility
//! - Record "person scanned today" facts exactly once per person per day.
//! - Report the already-stored record when a day's fact exists.
//!
//! # Invariants
//! - `try_record` is one atomic conditional insert. There is no
//!   read-then-write path: the `attendance_one_per_day` UNIQUE constraint
//!   decides which of several concurrent attempts wins.
//! - Only a UNIQUE violation maps to `AlreadyExists`; every other fault is a
//!   storage error and is never retried here.
//! - Records are never updated or deleted by the ledger.

use super::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::attendance::AttendanceRecord;
use chrono::{NaiveDate, NaiveTime};
use log::{debug, warn};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const RECORD_COLUMNS: &str = "id, person_token, attendance_date, time_in, created_at";

/// Result of an atomic record attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAttempt {
    /// This call created the day's record.
    Created(AttendanceRecord),
    /// The day's record already existed; carries the stored (winning) record.
    AlreadyExists(AttendanceRecord),
}

impl RecordAttempt {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            Self::Created(record) | Self::AlreadyExists(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Durable, append-only store of attendance records.
pub trait AttendanceLedger {
    /// Atomically records attendance unless one exists for `(person_token, date)`.
    ///
    /// `Err` is a storage failure; no record state may be assumed.
    fn try_record(
        &self,
        person_token: &str,
        date: NaiveDate,
        time_in: NaiveTime,
    ) -> RepoResult<RecordAttempt>;
    /// Loads the record for one person and day, if any.
    fn find(&self, person_token: &str, date: NaiveDate) -> RepoResult<Option<AttendanceRecord>>;
    /// Lists one day's records ordered by `time_in, id`.
    fn records_on(&self, date: NaiveDate) -> RepoResult<Vec<AttendanceRecord>>;
    /// Total number of stored records.
    fn count(&self) -> RepoResult<u64>;
}

impl<L: AttendanceLedger + ?Sized> AttendanceLedger for &L {
    fn try_record(
        &self,
        person_token: &str,
        date: NaiveDate,
        time_in: NaiveTime,
    ) -> RepoResult<RecordAttempt> {
        (**self).try_record(person_token, date, time_in)
    }

    fn find(&self, person_token: &str, date: NaiveDate) -> RepoResult<Option<AttendanceRecord>> {
        (**self).find(person_token, date)
    }

    fn records_on(&self, date: NaiveDate) -> RepoResult<Vec<AttendanceRecord>> {
        (**self).records_on(date)
    }

    fn count(&self) -> RepoResult<u64> {
        (**self).count()
    }
}

/// SQLite-backed attendance ledger.
///
/// Any number of ledgers, on any number of connections or processes, may
/// share one database file; the schema constraint serializes them.
pub struct SqliteAttendanceLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceLedger<'conn> {
    /// Creates the ledger from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["attendance"])?;
        Ok(Self { conn })
    }
}

impl AttendanceLedger for SqliteAttendanceLedger<'_> {
    fn try_record(
        &self,
        person_token: &str,
        date: NaiveDate,
        time_in: NaiveTime,
    ) -> RepoResult<RecordAttempt> {
        let inserted = self.conn.query_row(
            &format!(
                "INSERT INTO attendance (person_token, attendance_date, time_in)
                 VALUES (?1, ?2, ?3)
                 RETURNING {RECORD_COLUMNS};"
            ),
            params![person_token, date_to_db(date), time_to_db(time_in)],
            read_raw_record,
        );

        match inserted {
            Ok(raw) => {
                let record = raw.into_record()?;
                debug!(
                    "event=ledger_record module=repo status=created record_id={}",
                    record.id
                );
                Ok(RecordAttempt::Created(record))
            }
            Err(err) if is_unique_violation(&err) => {
                let Some(existing) = self.find(person_token, date)? else {
                    // Winner was purged between the insert and the read-back.
                    warn!(
                        "event=ledger_record module=repo status=error error_code=winner_missing date={}",
                        date_to_db(date)
                    );
                    return Err(RepoError::InvalidData(format!(
                        "attendance for {} rejected as duplicate but no stored record was found",
                        date_to_db(date)
                    )));
                };
                debug!(
                    "event=ledger_record module=repo status=already_exists record_id={}",
                    existing.id
                );
                Ok(RecordAttempt::AlreadyExists(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find(&self, person_token: &str, date: NaiveDate) -> RepoResult<Option<AttendanceRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS}
                     FROM attendance
                     WHERE person_token = ?1 AND attendance_date = ?2;"
                ),
                params![person_token, date_to_db(date)],
                read_raw_record,
            )
            .optional()?;

        raw.map(RawRecord::into_record).transpose()
    }

    fn records_on(&self, date: NaiveDate) -> RepoResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM attendance
             WHERE attendance_date = ?1
             ORDER BY time_in ASC, id ASC;"
        ))?;
        let rows = stmt.query_map([date_to_db(date)], read_raw_record)?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(raw?.into_record()?);
        }
        Ok(records)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attendance;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative attendance count {count}")))
    }
}

/// Column values as stored, before date/time decoding.
struct RawRecord {
    id: i64,
    person_token: String,
    date: String,
    time_in: String,
    created_at_ms: i64,
}

impl RawRecord {
    fn into_record(self) -> RepoResult<AttendanceRecord> {
        let date = parse_date(&self.date).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid date `{}` in attendance.attendance_date",
                self.date
            ))
        })?;
        let time_in = parse_time(&self.time_in).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid time `{}` in attendance.time_in",
                self.time_in
            ))
        })?;

        Ok(AttendanceRecord {
            id: self.id,
            person_token: self.person_token,
            date,
            time_in,
            created_at_ms: self.created_at_ms,
        })
    }
}

fn read_raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get("id")?,
        person_token: row.get("person_token")?,
        date: row.get("attendance_date")?,
        time_in: row.get("time_in")?,
        created_at_ms: row.get("created_at")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

pub(crate) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn time_to_db(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Accepts stored fractional seconds and drops them.
pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    let whole_seconds = value.split('.').next().unwrap_or(value);
    NaiveTime::parse_from_str(whole_seconds, TIME_FORMAT).ok()
}
