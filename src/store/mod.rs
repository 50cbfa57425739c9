//! SQLite storage for arbol
//!
//! Single database file holding users, the question registry, the answer
//! ledger, and the daily participation table. WAL mode and foreign keys are
//! always on; the schema version lives in `PRAGMA user_version`.
//!
//! The uniqueness constraints are the source of truth for the two critical
//! invariants: at most one active question per category (partial unique
//! index) and at most one answer batch per user per day (primary key on
//! `participations`). The Rust layer maps constraint violations to the
//! domain errors rather than re-checking ahead of time.

pub mod migrations;
pub mod queries;
pub mod schema;

use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{Category, Result};
use crate::vitality::{QuestionScore, VitalityReport};

pub use queries::answers::AnswerItem;
pub use queries::questions::Question;
pub use queries::users::User;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Open or create the arbol database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// True if the error is a UNIQUE or PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
}

/// True if the error is a FOREIGN KEY constraint violation.
pub(crate) fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

/// Shared handle to the arbol database.
///
/// Wraps a single connection in a mutex. Lock scopes never contain an await
/// point, so request handlers block only for the duration of one storage
/// call. Multi-step writes run inside rusqlite transactions; cross-process
/// correctness rests on the schema constraints, not on this lock.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open(path)?)),
        })
    }

    /// In-memory store for tests.
    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open_memory()?)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned mutex only means another thread panicked mid-call; the
        // connection itself is still usable (any open transaction was rolled
        // back on drop).
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ----- users -----

    pub fn create_user(&self, name: &str, password_hash: &str) -> Result<i64> {
        queries::users::insert(&self.conn(), name, password_hash, false)
    }

    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        queries::users::find_by_name(&self.conn(), name)
    }

    /// Idempotently create (or promote) the configured admin account.
    pub fn bootstrap_admin(&self, name: &str, password_hash: &str) -> Result<()> {
        queries::users::upsert_admin(&mut self.conn(), name, password_hash)
    }

    // ----- question registry -----

    pub fn list_active_questions(&self) -> Result<Vec<Question>> {
        queries::questions::list_active(&self.conn())
    }

    pub fn list_all_questions(&self) -> Result<Vec<Question>> {
        queries::questions::list_all(&self.conn())
    }

    pub fn create_question(&self, category: Category, text: &str, weight: f64) -> Result<Question> {
        queries::questions::create(&mut self.conn(), category, text, weight)
    }

    pub fn update_question(
        &self,
        id: i64,
        text: Option<&str>,
        weight: Option<f64>,
    ) -> Result<Question> {
        queries::questions::update(&self.conn(), id, text, weight)
    }

    pub fn deactivate_question(&self, id: i64) -> Result<()> {
        queries::questions::deactivate(&self.conn(), id)
    }

    pub fn hard_delete_question(&self, id: i64) -> Result<()> {
        queries::questions::hard_delete(&self.conn(), id)
    }

    /// Seed one default active question per category on a fresh database.
    pub fn seed_default_questions(&self) -> Result<bool> {
        queries::questions::seed_defaults(&mut self.conn())
    }

    // ----- answer ledger -----

    /// Record one answer batch for `(user_id, day)`, atomically.
    ///
    /// Fails with `AlreadyParticipated` if the user already has a batch for
    /// that day; any failure leaves no partial rows.
    pub fn submit_answers(&self, user_id: i64, day: NaiveDate, items: &[AnswerItem]) -> Result<()> {
        queries::answers::submit_batch(&mut self.conn(), user_id, day, items)
    }

    // ----- aggregation -----

    /// Compute the current vitality report from the registry and the ledger.
    pub fn vitality_report(&self) -> Result<VitalityReport> {
        let conn = self.conn();
        let breakdown: Vec<QuestionScore> = queries::answers::active_question_scores(&conn)?;
        let participants = queries::answers::distinct_participants(&conn)?;
        Ok(VitalityReport::new(participants, breakdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArbolError;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_memory().expect("open");
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_constraint_helpers() {
        let conn = open_memory().expect("open");
        queries::users::insert(&conn, "maria", "hash", false).expect("first insert");
        let err = queries::users::insert(&conn, "maria", "hash", false).unwrap_err();
        match err {
            ArbolError::DuplicateName => {}
            other => panic!("expected DuplicateName, got {other:?}"),
        }
    }
}
