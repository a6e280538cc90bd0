//! Domain model for identity resolution and attendance.
//!
//! # Responsibility
//! - Define the person payload returned by identity resolution.
//! - Define the immutable attendance record owned by the ledger.
//!
//! # Invariants
//! - A person is identified by an externally assigned, stable token.
//! - Attendance records are never mutated after creation.

pub mod attendance;
pub mod person;
