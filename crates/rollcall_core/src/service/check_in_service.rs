//! Check-in use-case service.
//!
//! # Responsibility
//! - Turn a raw scanned token into one explicit `CheckInOutcome`.
//! - Compose the user-facing message for each outcome.
//!
//! # Invariants
//! - No existence check precedes `try_record`; day-scoped uniqueness is owned
//!   entirely by the ledger's atomic conditional insert.
//! - The clock is read once per check-in, so date and time-of-day agree.
//! - `AlreadyRecorded` carries the stored record, never the attempt's time.
//! - Storage faults always surface as `Failed`, never as another outcome.

use crate::clock::Clock;
use crate::model::attendance::{format_time_12h, AttendanceRecord};
use crate::model::person::{normalize_token, Person};
use crate::repo::attendance_ledger::{AttendanceLedger, RecordAttempt};
use crate::repo::identity_store::IdentityStore;
use crate::repo::RepoError;
use chrono::NaiveTime;
use log::{error, info};
use std::time::Instant;

/// Which collaborator failed during a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    IdentityLookup,
    Ledger,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdentityLookup => "identity_lookup",
            Self::Ledger => "ledger",
        }
    }
}

/// Storage fault reported by a failed check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInFailure {
    pub stage: FailureStage,
    /// Diagnostic text of the underlying storage error.
    pub message: String,
}

/// Terminal result of one check-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// Token was blank or owned by nobody; the ledger was not touched.
    Unresolved { token: String },
    /// First check-in of the day; `record` was created by this call.
    Recorded {
        person: Person,
        record: AttendanceRecord,
    },
    /// The day's record already existed; `record` is the original one.
    AlreadyRecorded {
        person: Person,
        record: AttendanceRecord,
    },
    /// Storage fault; no record state may be assumed.
    Failed(CheckInFailure),
}

impl CheckInOutcome {
    /// Whether the person is known to be checked in for today.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Recorded { .. } | Self::AlreadyRecorded { .. })
    }

    pub fn person(&self) -> Option<&Person> {
        match self {
            Self::Recorded { person, .. } | Self::AlreadyRecorded { person, .. } => Some(person),
            Self::Unresolved { .. } | Self::Failed(_) => None,
        }
    }

    /// Recording time of today's record, if one is known.
    pub fn time_in(&self) -> Option<NaiveTime> {
        match self {
            Self::Recorded { record, .. } | Self::AlreadyRecorded { record, .. } => {
                Some(record.time_in)
            }
            Self::Unresolved { .. } | Self::Failed(_) => None,
        }
    }

    /// Short status label for logs and envelopes.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Unresolved { .. } => "unresolved",
            Self::Recorded { .. } => "recorded",
            Self::AlreadyRecorded { .. } => "already_recorded",
            Self::Failed(_) => "failed",
        }
    }

    /// User-facing message for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::Unresolved { token } if token.is_empty() => "No ID provided".to_string(),
            Self::Unresolved { token } => format!("Person with ID {token} not found"),
            Self::Recorded { record, .. } => format!(
                "Attendance recorded successfully at {}",
                format_time_12h(record.time_in)
            ),
            Self::AlreadyRecorded { record, .. } => format!(
                "Attendance already recorded today at {}",
                format_time_12h(record.time_in)
            ),
            Self::Failed(failure) => match failure.stage {
                FailureStage::IdentityLookup => "Database error looking up person".to_string(),
                FailureStage::Ledger => "Database error recording attendance".to_string(),
            },
        }
    }
}

/// Check-in engine over injected identity, ledger and clock collaborators.
pub struct CheckInService<I: IdentityStore, L: AttendanceLedger, C: Clock> {
    identities: I,
    ledger: L,
    clock: C,
}

impl<I: IdentityStore, L: AttendanceLedger, C: Clock> CheckInService<I, L, C> {
    pub fn new(identities: I, ledger: L, clock: C) -> Self {
        Self {
            identities,
            ledger,
            clock,
        }
    }

    /// Resolves `raw_token` and records today's attendance at most once.
    ///
    /// # Contract
    /// - Blank or unknown token: `Unresolved`, ledger untouched.
    /// - First success of the day: `Recorded` with the new record.
    /// - Later attempts the same day, concurrent or not: `AlreadyRecorded`
    ///   with the original record.
    /// - Storage fault in either collaborator: `Failed`.
    pub fn check_in(&self, raw_token: &str) -> CheckInOutcome {
        let started_at = Instant::now();
        let outcome = self.run(raw_token);

        match &outcome {
            CheckInOutcome::Failed(failure) => error!(
                "event=check_in module=service status=failed stage={} duration_ms={} error={}",
                failure.stage.as_str(),
                started_at.elapsed().as_millis(),
                failure.message
            ),
            other => info!(
                "event=check_in module=service status={} duration_ms={}",
                other.status(),
                started_at.elapsed().as_millis()
            ),
        }
        outcome
    }

    fn run(&self, raw_token: &str) -> CheckInOutcome {
        let Some(token) = normalize_token(raw_token) else {
            return CheckInOutcome::Unresolved {
                token: String::new(),
            };
        };

        let person = match self.identities.resolve(token) {
            Ok(Some(person)) => person,
            Ok(None) => {
                return CheckInOutcome::Unresolved {
                    token: token.to_string(),
                }
            }
            Err(err) => return failed(FailureStage::IdentityLookup, &err),
        };

        let now = self.clock.now();
        match self.ledger.try_record(&person.token, now.date(), now.time()) {
            Ok(RecordAttempt::Created(record)) => CheckInOutcome::Recorded { person, record },
            Ok(RecordAttempt::AlreadyExists(record)) => {
                CheckInOutcome::AlreadyRecorded { person, record }
            }
            Err(err) => failed(FailureStage::Ledger, &err),
        }
    }
}

fn failed(stage: FailureStage, err: &RepoError) -> CheckInOutcome {
    CheckInOutcome::Failed(CheckInFailure {
        stage,
        message: format!("{}: {err}", err.code()),
    })
}
