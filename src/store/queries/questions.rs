//! Question registry query functions.
//!
//! The registry keeps full history: superseding or deleting a question
//! deactivates it by default so historical answers stay referentially valid.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::store::is_foreign_key_violation;
use crate::types::{ArbolError, Category, Result};

/// A survey question, active or historical.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub category: Category,
    pub text: String,
    pub weight: f64,
    pub active: bool,
    pub created_at: String,
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    let category: String = row.get(1)?;
    Ok(Question {
        id: row.get(0)?,
        category: category.parse().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("bad category '{category}'").into(),
            )
        })?,
        text: row.get(2)?,
        weight: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const QUESTION_COLUMNS: &str = "id, category, text, weight, active, created_at";

/// Active questions in canonical category order (trunk, branches, leaves).
pub fn list_active(conn: &Connection) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE active = 1
         ORDER BY CASE category WHEN 'trunk' THEN 0 WHEN 'branches' THEN 1 ELSE 2 END"
    ))?;

    let rows = stmt
        .query_map([], question_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Full question history, oldest first.
pub fn list_all(conn: &Connection) -> Result<Vec<Question>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY id"))?;

    let rows = stmt
        .query_map([], question_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Get a question by id.
pub fn get(conn: &Connection, id: i64) -> Result<Question> {
    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
        [id],
        question_from_row,
    )
    .optional()?
    .ok_or_else(|| ArbolError::NotFound(format!("question {id} not found")))
}

/// Create a new active question for `category`, superseding the current one.
///
/// The deactivate + insert pair runs in one transaction, so the partial
/// unique index on active categories never observes two active rows.
pub fn create(conn: &mut Connection, category: Category, text: &str, weight: f64) -> Result<Question> {
    validate_text(text)?;
    validate_weight(weight)?;

    let tx = conn.transaction()?;

    tx.execute(
        "UPDATE questions SET active = 0 WHERE category = ?1 AND active = 1",
        [category.as_str()],
    )?;
    tx.execute(
        "INSERT INTO questions (category, text, weight, active, created_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
        rusqlite::params![category.as_str(), text, weight, Utc::now().to_rfc3339()],
    )?;
    let id = tx.last_insert_rowid();
    let question = get(&tx, id)?;

    tx.commit()?;
    Ok(question)
}

/// Update the mutable fields of a question in place.
///
/// Omitted fields keep their value; the active flag is untouched.
pub fn update(conn: &Connection, id: i64, text: Option<&str>, weight: Option<f64>) -> Result<Question> {
    if text.is_none() && weight.is_none() {
        return Err(ArbolError::Validation(
            "nothing to update: provide text and/or weight".into(),
        ));
    }
    if let Some(text) = text {
        validate_text(text)?;
    }
    if let Some(weight) = weight {
        validate_weight(weight)?;
    }

    let changed = conn.execute(
        "UPDATE questions
         SET text = COALESCE(?1, text), weight = COALESCE(?2, weight)
         WHERE id = ?3",
        rusqlite::params![text, weight, id],
    )?;

    if changed == 0 {
        return Err(ArbolError::NotFound(format!("question {id} not found")));
    }

    get(conn, id)
}

/// Soft delete: mark the question inactive, preserving history.
pub fn deactivate(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("UPDATE questions SET active = 0 WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(ArbolError::NotFound(format!("question {id} not found")));
    }
    Ok(())
}

/// Hard delete, for questions with no recorded answers only.
///
/// The answers foreign key has no cascade, so deleting a question that has
/// history fails and maps to `Conflict`.
pub fn hard_delete(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM questions WHERE id = ?1", [id])
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ArbolError::Conflict(format!(
                    "question {id} has recorded answers; deactivate it instead"
                ))
            } else {
                ArbolError::Database(e)
            }
        })?;

    if changed == 0 {
        return Err(ArbolError::NotFound(format!("question {id} not found")));
    }
    Ok(())
}

/// Seed the three base questions on a fresh database.
///
/// Returns true if questions were inserted. Prompts match the original
/// Barcelona deployment.
pub fn seed_defaults(conn: &mut Connection) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(false);
    }

    let defaults: [(Category, &str); 3] = [
        (
            Category::Trunk,
            "¿Cómo valoras la calidad del aire hoy en tu entorno?",
        ),
        (
            Category::Branches,
            "¿Cómo valoras el nivel de ruido o tranquilidad?",
        ),
        (Category::Leaves, "¿Cómo valoras la limpieza de tu entorno?"),
    ];

    for (category, text) in defaults {
        create(conn, category, text, 1.0)?;
    }
    Ok(true)
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ArbolError::Validation("question text must not be empty".into()));
    }
    Ok(())
}

fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ArbolError::Validation(format!(
            "weight must be a positive number, got {weight}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::store::open_memory().expect("open test db")
    }

    #[test]
    fn test_create_and_list_active() {
        let mut conn = test_db();
        create(&mut conn, Category::Leaves, "How clean is your street?", 1.0).expect("create");
        create(&mut conn, Category::Trunk, "How is the air today?", 2.0).expect("create");

        let active = list_active(&conn).expect("list");
        assert_eq!(active.len(), 2);
        // Canonical order: trunk before leaves
        assert_eq!(active[0].category, Category::Trunk);
        assert_eq!(active[1].category, Category::Leaves);
    }

    #[test]
    fn test_replace_active_deactivates_predecessor() {
        let mut conn = test_db();
        let first = create(&mut conn, Category::Leaves, "First prompt", 1.0).expect("create");
        let second = create(&mut conn, Category::Leaves, "Second prompt", 2.0).expect("create");

        let active = list_active(&conn).expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        // The predecessor survives in history, inactive
        let all = list_all(&conn).expect("list all");
        assert_eq!(all.len(), 2);
        let old = all.iter().find(|q| q.id == first.id).expect("history row");
        assert!(!old.active);
    }

    #[test]
    fn test_active_never_has_duplicate_categories() {
        let mut conn = test_db();
        for i in 0..4 {
            create(&mut conn, Category::Trunk, &format!("Prompt {i}"), 1.0).expect("create");
            create(&mut conn, Category::Branches, &format!("Prompt {i}"), 1.0).expect("create");
        }

        let active = list_active(&conn).expect("list");
        let mut seen = std::collections::HashSet::new();
        for q in &active {
            assert!(seen.insert(q.category), "duplicate active category {:?}", q.category);
        }
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let mut conn = test_db();
        assert!(matches!(
            create(&mut conn, Category::Trunk, "Prompt", 0.0),
            Err(ArbolError::Validation(_))
        ));
        assert!(matches!(
            create(&mut conn, Category::Trunk, "Prompt", -1.5),
            Err(ArbolError::Validation(_))
        ));
        assert!(matches!(
            create(&mut conn, Category::Trunk, "Prompt", f64::NAN),
            Err(ArbolError::Validation(_))
        ));
    }

    #[test]
    fn test_update_partial_fields() {
        let mut conn = test_db();
        let q = create(&mut conn, Category::Trunk, "Old text", 1.0).expect("create");

        let updated = update(&conn, q.id, Some("New text"), None).expect("update text");
        assert_eq!(updated.text, "New text");
        assert_eq!(updated.weight, 1.0);
        assert!(updated.active);

        let updated = update(&conn, q.id, None, Some(2.5)).expect("update weight");
        assert_eq!(updated.text, "New text");
        assert_eq!(updated.weight, 2.5);
    }

    #[test]
    fn test_update_unknown_id() {
        let conn = test_db();
        assert!(matches!(
            update(&conn, 999, Some("text"), None),
            Err(ArbolError::NotFound(_))
        ));
    }

    #[test]
    fn test_hard_delete_without_history() {
        let mut conn = test_db();
        let q = create(&mut conn, Category::Trunk, "Prompt", 1.0).expect("create");
        hard_delete(&conn, q.id).expect("delete");
        assert!(matches!(get(&conn, q.id), Err(ArbolError::NotFound(_))));
    }

    #[test]
    fn test_hard_delete_with_answers_conflicts() {
        let mut conn = test_db();
        let q = create(&mut conn, Category::Trunk, "Prompt", 1.0).expect("create");
        let user = crate::store::queries::users::insert(&conn, "maria", "hash", false)
            .expect("user");
        conn.execute(
            "INSERT INTO answers (user_id, question_id, value, submitted_on)
             VALUES (?1, ?2, 5, '2025-03-01')",
            [user, q.id],
        )
        .expect("answer");

        assert!(matches!(hard_delete(&conn, q.id), Err(ArbolError::Conflict(_))));
        // Soft delete still works
        deactivate(&conn, q.id).expect("deactivate");
        assert!(!get(&conn, q.id).expect("get").active);
    }

    #[test]
    fn test_seed_defaults_once() {
        let mut conn = test_db();
        assert!(seed_defaults(&mut conn).expect("seed"));
        assert_eq!(list_active(&conn).expect("list").len(), 3);
        // Second call is a no-op
        assert!(!seed_defaults(&mut conn).expect("seed again"));
        assert_eq!(list_all(&conn).expect("list all").len(), 3);
    }
}
