//! Time source for day-scoped attendance.
//!
//! # Responsibility
//! - Provide "today" and "current time-of-day" from one injected source.
//! - Allow tests to pin and advance time deterministically.
//!
//! # Invariants
//! - `today()` and `time_of_day()` derive from a single `now()` reading when
//!   callers use `now()` once and split it.
//! - Returned times carry whole-second precision, matching stored values.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

/// Injected wall-clock abstraction.
pub trait Clock {
    /// Current civil date-time under this clock's timezone policy.
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    fn time_of_day(&self) -> NaiveTime {
        self.now().time()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Which civil calendar decides where one attendance day ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockPolicy {
    /// Server-local time.
    #[default]
    Local,
    Utc,
}

impl ClockPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "utc" => Some(Self::Utc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Utc => "utc",
        }
    }
}

/// Real clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    policy: ClockPolicy,
}

impl SystemClock {
    pub fn new(policy: ClockPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ClockPolicy {
        self.policy
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = match self.policy {
            ClockPolicy::Local => Local::now().naive_local(),
            ClockPolicy::Utc => Utc::now().naive_utc(),
        };
        truncate_to_seconds(now)
    }
}

/// Manually driven clock for tests and replay.
///
/// Safe to share between threads; every reader observes the latest `set`.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(truncate_to_seconds(now)),
        }
    }

    /// Convenience constructor from calendar parts.
    ///
    /// Returns `None` for an impossible date or time.
    pub fn at(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;
        Some(Self::new(date.and_time(time)))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.guard() = truncate_to_seconds(now);
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.guard();
        *guard = truncate_to_seconds(*guard + by);
    }

    fn guard(&self) -> MutexGuard<'_, NaiveDateTime> {
        // A panicking test thread must not wedge every other reader.
        self.now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.guard()
    }
}

fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}
