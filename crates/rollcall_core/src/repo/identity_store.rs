//! Identity resolution contract and SQLite implementation.
//!
//! # Responsibility
//! - Resolve a scanned token to a known `Person`.
//!
//! # Invariants
//! - Lookups are read-only and never fabricate a person.
//! - A miss is `Ok(None)`; only storage faults are errors.

use super::{ensure_connection_ready, RepoResult};
use crate::model::person::Person;
use rusqlite::{Connection, OptionalExtension, Row};

/// Read-only identity directory as seen by check-in.
pub trait IdentityStore {
    /// Returns the person owning `token`, or `None` when nobody does.
    fn resolve(&self, token: &str) -> RepoResult<Option<Person>>;
}

impl<S: IdentityStore + ?Sized> IdentityStore for &S {
    fn resolve(&self, token: &str) -> RepoResult<Option<Person>> {
        (**self).resolve(token)
    }
}

/// SQLite-backed identity store over the `persons` table.
pub struct SqliteIdentityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["persons"])?;
        Ok(Self { conn })
    }
}

impl IdentityStore for SqliteIdentityStore<'_> {
    fn resolve(&self, token: &str) -> RepoResult<Option<Person>> {
        let person = self
            .conn
            .query_row(
                "SELECT token, last_name, first_name, course, level, image_filename
                 FROM persons
                 WHERE token = ?1;",
                [token],
                parse_person_row,
            )
            .optional()?;
        Ok(person)
    }
}

fn parse_person_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        token: row.get("token")?,
        last_name: row.get("last_name")?,
        first_name: row.get("first_name")?,
        course: row.get("course")?,
        level: row.get("level")?,
        image_filename: row.get("image_filename")?,
    })
}
