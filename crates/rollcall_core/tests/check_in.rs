use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rollcall_core::db::{open_db, open_db_in_memory};
use rollcall_core::{
    AttendanceLedger, AttendanceRecord, CheckInOutcome, CheckInService, Clock, FailureStage,
    FixedClock, IdentityStore, Person, RecordAttempt, RepoError, RepoResult,
    SqliteAttendanceLedger, SqliteIdentityStore,
};
use rusqlite::{params, Connection};
use std::cell::Cell;
use std::sync::{Arc, Barrier};

#[test]
fn first_scan_records_and_repeat_scan_reports_original_time() {
    let conn = open_db_in_memory().unwrap();
    seed_person(&conn, "S100", "Reyes", "Ana");
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = sqlite_service(&conn, &clock);

    let first = service.check_in("S100");
    match &first {
        CheckInOutcome::Recorded { person, record } => {
            assert_eq!(person.token, "S100");
            assert_eq!(record.date, date(2024, 3, 1));
            assert_eq!(record.time_in, time(8, 0));
        }
        other => panic!("expected recorded, got {other:?}"),
    }
    assert_eq!(
        first.message(),
        "Attendance recorded successfully at 8:00 AM"
    );

    clock.advance(Duration::minutes(5));
    let second = service.check_in("S100");
    match &second {
        CheckInOutcome::AlreadyRecorded { person, record } => {
            assert_eq!(person.first_name, "Ana");
            assert_eq!(record.time_in, time(8, 0));
        }
        other => panic!("expected already recorded, got {other:?}"),
    }
    assert_eq!(second.time_in(), Some(time(8, 0)));
    assert_eq!(
        second.message(),
        "Attendance already recorded today at 8:00 AM"
    );
    assert_eq!(ledger_count(&conn), 1);
}

#[test]
fn unknown_token_is_unresolved_and_leaves_ledger_untouched() {
    let conn = open_db_in_memory().unwrap();
    seed_person(&conn, "S100", "Reyes", "Ana");
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = sqlite_service(&conn, &clock);
    service.check_in("S100");
    let before = ledger_count(&conn);

    let outcome = service.check_in("ZZZ");

    assert_eq!(
        outcome,
        CheckInOutcome::Unresolved {
            token: "ZZZ".to_string()
        }
    );
    assert_eq!(outcome.message(), "Person with ID ZZZ not found");
    assert!(!outcome.is_success());
    assert_eq!(ledger_count(&conn), before);
}

#[test]
fn scanner_whitespace_is_trimmed_before_lookup() {
    let conn = open_db_in_memory().unwrap();
    seed_person(&conn, "S100", "Reyes", "Ana");
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = sqlite_service(&conn, &clock);

    let outcome = service.check_in("  S100\n");
    assert!(matches!(outcome, CheckInOutcome::Recorded { .. }));
}

#[test]
fn blank_token_skips_identity_lookup_and_ledger() {
    let identities = ScriptedIdentities::new(Ok(Some(person("S100"))));
    let ledger = ScriptedLedger::new(|| unreachable!("ledger must not be called"));
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = CheckInService::new(&identities, &ledger, &clock);

    let outcome = service.check_in("   ");

    assert_eq!(
        outcome,
        CheckInOutcome::Unresolved {
            token: String::new()
        }
    );
    assert_eq!(outcome.message(), "No ID provided");
    assert_eq!(identities.calls.get(), 0);
    assert_eq!(ledger.calls.get(), 0);
}

#[test]
fn unresolved_token_never_reaches_ledger() {
    let identities = ScriptedIdentities::new(Ok(None));
    let ledger = ScriptedLedger::new(|| unreachable!("ledger must not be called"));
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = CheckInService::new(&identities, &ledger, &clock);

    let outcome = service.check_in("ZZZ");

    assert!(matches!(outcome, CheckInOutcome::Unresolved { .. }));
    assert_eq!(identities.calls.get(), 1);
    assert_eq!(ledger.calls.get(), 0);
}

#[test]
fn ledger_storage_failure_is_failed_and_leaves_no_record() {
    let conn = open_db_in_memory().unwrap();
    seed_person(&conn, "S100", "Reyes", "Ana");
    conn.execute_batch(
        "CREATE TRIGGER attendance_offline
         BEFORE INSERT ON attendance
         BEGIN
             SELECT RAISE(ABORT, 'storage offline');
         END;",
    )
    .unwrap();
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = sqlite_service(&conn, &clock);

    let outcome = service.check_in("S100");

    match &outcome {
        CheckInOutcome::Failed(failure) => {
            assert_eq!(failure.stage, FailureStage::Ledger);
            assert!(failure.message.contains("storage offline"));
        }
        other => panic!("expected failed, got {other:?}"),
    }
    assert_eq!(outcome.message(), "Database error recording attendance");
    assert!(!outcome.is_success());

    conn.execute_batch("DROP TRIGGER attendance_offline;").unwrap();
    assert_eq!(ledger_count(&conn), 0);

    let retried = service.check_in("S100");
    assert!(matches!(retried, CheckInOutcome::Recorded { .. }));
}

#[test]
fn identity_lookup_failure_is_failed_not_unresolved() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = sqlite_service(&conn, &clock);
    conn.execute_batch("DROP TABLE persons;").unwrap();

    let outcome = service.check_in("S100");

    assert!(matches!(
        outcome,
        CheckInOutcome::Failed(ref failure) if failure.stage == FailureStage::IdentityLookup
    ));
    assert_eq!(ledger_count(&conn), 0);
}

#[test]
fn scripted_storage_fault_is_failed() {
    let identities = ScriptedIdentities::new(Ok(Some(person("S100"))));
    let ledger = ScriptedLedger::new(|| {
        Err(RepoError::InvalidData("disk went away".to_string()))
    });
    let clock = FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap();
    let service = CheckInService::new(&identities, &ledger, &clock);

    let outcome = service.check_in("S100");

    match outcome {
        CheckInOutcome::Failed(failure) => {
            assert_eq!(failure.stage, FailureStage::Ledger);
            assert!(failure.message.starts_with("invalid_data"));
            assert!(failure.message.contains("disk went away"));
        }
        other => panic!("expected failed, got {other:?}"),
    }
    assert_eq!(ledger.calls.get(), 1);
}

#[test]
fn new_day_after_midnight_records_again() {
    let conn = open_db_in_memory().unwrap();
    seed_person(&conn, "S100", "Reyes", "Ana");
    let clock = FixedClock::at(2024, 3, 1, 23, 59, 0).unwrap();
    let service = sqlite_service(&conn, &clock);

    assert!(matches!(
        service.check_in("S100"),
        CheckInOutcome::Recorded { .. }
    ));

    clock.advance(Duration::minutes(2));
    match service.check_in("S100") {
        CheckInOutcome::Recorded { record, .. } => {
            assert_eq!(record.date, date(2024, 3, 2));
            assert_eq!(record.time_in, time(0, 1));
        }
        other => panic!("expected recorded on the next day, got {other:?}"),
    }
    assert_eq!(ledger_count(&conn), 2);
}

#[test]
fn clock_is_read_once_per_check_in() {
    let conn = open_db_in_memory().unwrap();
    seed_person(&conn, "S100", "Reyes", "Ana");
    let clock = CountingClock {
        now: date(2024, 3, 1).and_time(time(8, 0)),
        reads: Cell::new(0),
    };
    let service = CheckInService::new(
        SqliteIdentityStore::try_new(&conn).unwrap(),
        SqliteAttendanceLedger::try_new(&conn).unwrap(),
        &clock,
    );

    service.check_in("S100");
    service.check_in("S100");
    service.check_in("ZZZ");

    assert_eq!(clock.reads.get(), 2);
}

#[test]
fn concurrent_scans_of_one_person_record_exactly_once() {
    const STATIONS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations.db");
    {
        let conn = open_db(&path).unwrap();
        seed_person(&conn, "S100", "Reyes", "Ana");
    }

    let clock = Arc::new(FixedClock::at(2024, 3, 1, 8, 0, 0).unwrap());
    let barrier = Arc::new(Barrier::new(STATIONS));
    let handles: Vec<_> = (0..STATIONS)
        .map(|_| {
            let path = path.clone();
            let clock = Arc::clone(&clock);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = CheckInService::new(
                    SqliteIdentityStore::try_new(&conn).unwrap(),
                    SqliteAttendanceLedger::try_new(&conn).unwrap(),
                    clock,
                );
                barrier.wait();
                service.check_in("S100")
            })
        })
        .collect();

    let outcomes: Vec<CheckInOutcome> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let recorded = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, CheckInOutcome::Recorded { .. }))
        .count();
    let already = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, CheckInOutcome::AlreadyRecorded { .. }))
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(already, STATIONS - 1);
    assert!(outcomes
        .iter()
        .all(|outcome| outcome.time_in() == Some(time(8, 0))));

    let conn = open_db(&path).unwrap();
    assert_eq!(ledger_count(&conn), 1);
}

#[test]
fn concurrent_scans_of_different_people_all_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crowd.db");
    let tokens = ["S100", "S200", "S300", "S400"];
    {
        let conn = open_db(&path).unwrap();
        for token in tokens {
            seed_person(&conn, token, "Student", token);
        }
    }

    let clock = Arc::new(FixedClock::at(2024, 3, 1, 7, 30, 0).unwrap());
    let barrier = Arc::new(Barrier::new(tokens.len()));
    let handles: Vec<_> = tokens
        .into_iter()
        .map(|token| {
            let path = path.clone();
            let clock = Arc::clone(&clock);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = CheckInService::new(
                    SqliteIdentityStore::try_new(&conn).unwrap(),
                    SqliteAttendanceLedger::try_new(&conn).unwrap(),
                    clock,
                );
                barrier.wait();
                service.check_in(token)
            })
        })
        .collect();

    for handle in handles {
        assert!(matches!(
            handle.join().unwrap(),
            CheckInOutcome::Recorded { .. }
        ));
    }
    let conn = open_db(&path).unwrap();
    assert_eq!(ledger_count(&conn), 4);
}

fn sqlite_service<'a>(
    conn: &'a Connection,
    clock: &'a FixedClock,
) -> CheckInService<SqliteIdentityStore<'a>, SqliteAttendanceLedger<'a>, &'a FixedClock> {
    CheckInService::new(
        SqliteIdentityStore::try_new(conn).unwrap(),
        SqliteAttendanceLedger::try_new(conn).unwrap(),
        clock,
    )
}

fn seed_person(conn: &Connection, token: &str, last_name: &str, first_name: &str) {
    conn.execute(
        "INSERT INTO persons (token, last_name, first_name, course, level)
         VALUES (?1, ?2, ?3, 'BSCS', '2');",
        params![token, last_name, first_name],
    )
    .unwrap();
}

fn ledger_count(conn: &Connection) -> u64 {
    SqliteAttendanceLedger::try_new(conn)
        .unwrap()
        .count()
        .unwrap()
}

fn person(token: &str) -> Person {
    Person {
        token: token.to_string(),
        last_name: "Reyes".to_string(),
        first_name: "Ana".to_string(),
        course: "BSCS".to_string(),
        level: "2".to_string(),
        image_filename: None,
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

struct ScriptedIdentities {
    answer: RepoResult<Option<Person>>,
    calls: Cell<u32>,
}

impl ScriptedIdentities {
    fn new(answer: RepoResult<Option<Person>>) -> Self {
        Self {
            answer,
            calls: Cell::new(0),
        }
    }
}

impl IdentityStore for ScriptedIdentities {
    fn resolve(&self, _token: &str) -> RepoResult<Option<Person>> {
        self.calls.set(self.calls.get() + 1);
        match &self.answer {
            Ok(person) => Ok(person.clone()),
            Err(err) => Err(RepoError::InvalidData(err.to_string())),
        }
    }
}

struct ScriptedLedger<F: Fn() -> RepoResult<RecordAttempt>> {
    attempt: F,
    calls: Cell<u32>,
}

impl<F: Fn() -> RepoResult<RecordAttempt>> ScriptedLedger<F> {
    fn new(attempt: F) -> Self {
        Self {
            attempt,
            calls: Cell::new(0),
        }
    }
}

impl<F: Fn() -> RepoResult<RecordAttempt>> AttendanceLedger for ScriptedLedger<F> {
    fn try_record(
        &self,
        _person_token: &str,
        _date: NaiveDate,
        _time_in: NaiveTime,
    ) -> RepoResult<RecordAttempt> {
        self.calls.set(self.calls.get() + 1);
        (self.attempt)()
    }

    fn find(&self, _person_token: &str, _date: NaiveDate) -> RepoResult<Option<AttendanceRecord>> {
        Ok(None)
    }

    fn records_on(&self, _date: NaiveDate) -> RepoResult<Vec<AttendanceRecord>> {
        Ok(Vec::new())
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(0)
    }
}

struct CountingClock {
    now: NaiveDateTime,
    reads: Cell<u32>,
}

impl Clock for CountingClock {
    fn now(&self) -> NaiveDateTime {
        self.reads.set(self.reads.get() + 1);
        self.now
    }
}
