//! User query functions.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::store::is_unique_violation;
use crate::types::{ArbolError, Result};

/// A user row.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Insert a new user. A unique-name violation maps to `DuplicateName`.
pub fn insert(conn: &Connection, name: &str, password_hash: &str, is_admin: bool) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (name, password_hash, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, password_hash, is_admin, Utc::now().to_rfc3339()],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ArbolError::DuplicateName
        } else {
            ArbolError::Database(e)
        }
    })?;

    Ok(conn.last_insert_rowid())
}

/// Look up a user by display name (case-sensitive).
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, password_hash, is_admin FROM users WHERE name = ?1",
        [name],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                password_hash: row.get(2)?,
                is_admin: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(ArbolError::Database)
}

/// Create or promote the configured admin account.
///
/// Existing accounts keep their password but gain the admin flag; the
/// configured password only applies when the row is first created.
pub fn upsert_admin(conn: &mut Connection, name: &str, password_hash: &str) -> Result<()> {
    let tx = conn.transaction()?;

    let existing: Option<i64> = tx
        .query_row("SELECT id FROM users WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;

    match existing {
        Some(id) => {
            tx.execute("UPDATE users SET is_admin = 1 WHERE id = ?1", [id])?;
        }
        None => {
            tx.execute(
                "INSERT INTO users (name, password_hash, is_admin, created_at)
                 VALUES (?1, ?2, 1, ?3)",
                rusqlite::params![name, password_hash, Utc::now().to_rfc3339()],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}
