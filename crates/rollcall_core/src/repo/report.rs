//! Day attendance report.
//!
//! # Responsibility
//! - List one day's attendance joined with person display fields.
//!
//! # Invariants
//! - Read-only; never part of the check-in write path.
//! - Records whose person was removed are still listed, with `N/A` fields.
//! - Rows are ordered by `time_in ASC, id ASC`.

use super::attendance_ledger::{date_to_db, parse_time};
use super::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::attendance::RecordId;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, Row};
use serde::Serialize;

/// Placeholder for display fields of a person no longer in the directory.
pub const MISSING_FIELD: &str = "N/A";

/// One line of a day report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReportRow {
    pub record_id: RecordId,
    #[serde(rename = "idno")]
    pub person_token: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    pub course: String,
    pub level: String,
    pub date: NaiveDate,
    pub time_in: NaiveTime,
}

/// Lists attendance recorded on `date`.
pub fn attendance_for_date(conn: &Connection, date: NaiveDate) -> RepoResult<Vec<DayReportRow>> {
    ensure_connection_ready(conn, &["attendance", "persons"])?;

    let mut stmt = conn.prepare(
        "SELECT
            a.id AS id,
            a.person_token AS person_token,
            COALESCE(p.last_name, ?2) AS last_name,
            COALESCE(p.first_name, ?2) AS first_name,
            COALESCE(p.course, ?2) AS course,
            COALESCE(p.level, ?2) AS level,
            a.time_in AS time_in
         FROM attendance a
         LEFT JOIN persons p ON p.token = a.person_token
         WHERE a.attendance_date = ?1
         ORDER BY a.time_in ASC, a.id ASC;",
    )?;
    let mut rows = stmt.query(rusqlite::params![date_to_db(date), MISSING_FIELD])?;

    let mut report = Vec::new();
    while let Some(row) = rows.next()? {
        report.push(parse_report_row(row, date)?);
    }
    Ok(report)
}

fn parse_report_row(row: &Row<'_>, date: NaiveDate) -> RepoResult<DayReportRow> {
    let time_text: String = row.get("time_in")?;
    let time_in = parse_time(&time_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid time `{time_text}` in attendance.time_in"))
    })?;

    Ok(DayReportRow {
        record_id: row.get("id")?,
        person_token: row.get("person_token")?,
        last_name: row.get("last_name")?,
        first_name: row.get("first_name")?,
        course: row.get("course")?,
        level: row.get("level")?,
        date,
        time_in,
    })
}
