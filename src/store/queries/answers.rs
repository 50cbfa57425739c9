//! Answer ledger queries and the daily participation guard.

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use std::collections::HashSet;

use crate::store::is_unique_violation;
use crate::types::{ArbolError, Result, ANSWER_MAX, ANSWER_MIN};
use crate::vitality::QuestionScore;

/// One answer within a submission batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub question_id: i64,
    pub value: i64,
}

/// Record one answer batch for `(user_id, day)` as a single atomic unit.
///
/// The insert into `participations` doubles as the reservation: its primary
/// key on `(user_id, submitted_on)` is the sole source of truth for the
/// one-batch-per-day rule. Two racing submissions for the same user and day
/// both reach that insert; the constraint lets exactly one through and the
/// loser's transaction rolls back without partial answer rows.
pub fn submit_batch(
    conn: &mut Connection,
    user_id: i64,
    day: NaiveDate,
    items: &[AnswerItem],
) -> Result<()> {
    validate_batch(items)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Every referenced question must currently be active.
    for item in items {
        let active: Option<bool> = tx
            .query_row(
                "SELECT active FROM questions WHERE id = ?1",
                [item.question_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match active {
            None => {
                return Err(ArbolError::Validation(format!(
                    "unknown question id {}",
                    item.question_id
                )))
            }
            Some(false) => {
                return Err(ArbolError::Validation(format!(
                    "question {} is no longer active",
                    item.question_id
                )))
            }
            Some(true) => {}
        }
    }

    tx.execute(
        "INSERT INTO participations (user_id, submitted_on) VALUES (?1, ?2)",
        rusqlite::params![user_id, day.to_string()],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ArbolError::AlreadyParticipated
        } else {
            ArbolError::Database(e)
        }
    })?;

    for item in items {
        tx.execute(
            "INSERT INTO answers (user_id, question_id, value, submitted_on)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, item.question_id, item.value, day.to_string()],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Batch shape checks that need no storage access.
fn validate_batch(items: &[AnswerItem]) -> Result<()> {
    if items.is_empty() {
        return Err(ArbolError::Validation("no answers submitted".into()));
    }

    let mut seen = HashSet::new();
    for item in items {
        if !(ANSWER_MIN..=ANSWER_MAX).contains(&item.value) {
            return Err(ArbolError::Validation(format!(
                "answer value {} out of range ({ANSWER_MIN}-{ANSWER_MAX})",
                item.value
            )));
        }
        if !seen.insert(item.question_id) {
            return Err(ArbolError::Validation(format!(
                "duplicate answer for question {}",
                item.question_id
            )));
        }
    }
    Ok(())
}

/// Per-question averages over the whole ledger, for active questions only.
///
/// A question with no answers contributes an average of 0, not null.
pub fn active_question_scores(conn: &Connection) -> Result<Vec<QuestionScore>> {
    let mut stmt = conn.prepare(
        "SELECT q.id, q.category, q.text, q.weight,
                COALESCE(AVG(a.value), 0.0) AS average,
                COUNT(a.id) AS responses
         FROM questions q
         LEFT JOIN answers a ON a.question_id = q.id
         WHERE q.active = 1
         GROUP BY q.id
         ORDER BY CASE q.category WHEN 'trunk' THEN 0 WHEN 'branches' THEN 1 ELSE 2 END",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let category: String = row.get(1)?;
            Ok((
                row.get::<_, i64>(0)?,
                category,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, category, text, weight, average, responses)| {
            Ok(QuestionScore {
                question_id: id,
                category: category.parse()?,
                text,
                weight,
                average,
                responses: responses as u64,
            })
        })
        .collect()
}

/// Number of distinct users with at least one recorded answer, ever.
pub fn distinct_participants(conn: &Connection) -> Result<u64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(DISTINCT user_id) FROM answers", [], |row| {
            row.get(0)
        })?;
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::queries::{questions, users};
    use crate::types::Category;

    fn test_db() -> Connection {
        crate::store::open_memory().expect("open test db")
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    fn seed(conn: &mut Connection) -> (i64, Vec<i64>) {
        let user = users::insert(conn, "maria", "hash", false).expect("user");
        let q1 = questions::create(conn, Category::Trunk, "Air?", 1.0).expect("q1");
        let q2 = questions::create(conn, Category::Branches, "Noise?", 1.0).expect("q2");
        (user, vec![q1.id, q2.id])
    }

    fn answer_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM answers", [], |row| row.get(0))
            .expect("count")
    }

    #[test]
    fn test_batch_is_recorded() {
        let mut conn = test_db();
        let (user, qs) = seed(&mut conn);

        let items = vec![
            AnswerItem { question_id: qs[0], value: 8 },
            AnswerItem { question_id: qs[1], value: 6 },
        ];
        submit_batch(&mut conn, user, day("2025-03-01"), &items).expect("submit");

        assert_eq!(answer_count(&conn), 2);
        assert_eq!(distinct_participants(&conn).expect("participants"), 1);
    }

    #[test]
    fn test_second_batch_same_day_rejected() {
        let mut conn = test_db();
        let (user, qs) = seed(&mut conn);
        let items = vec![AnswerItem { question_id: qs[0], value: 5 }];

        submit_batch(&mut conn, user, day("2025-03-01"), &items).expect("first");
        match submit_batch(&mut conn, user, day("2025-03-01"), &items) {
            Err(ArbolError::AlreadyParticipated) => {}
            other => panic!("expected AlreadyParticipated, got {other:?}"),
        }
        // No partial write from the losing batch
        assert_eq!(answer_count(&conn), 1);

        // A new day is a new batch
        submit_batch(&mut conn, user, day("2025-03-02"), &items).expect("next day");
        assert_eq!(answer_count(&conn), 2);
    }

    #[test]
    fn test_out_of_range_value_writes_nothing() {
        let mut conn = test_db();
        let (user, qs) = seed(&mut conn);

        for bad in [0, 11, -3] {
            let items = vec![
                AnswerItem { question_id: qs[0], value: 7 },
                AnswerItem { question_id: qs[1], value: bad },
            ];
            match submit_batch(&mut conn, user, day("2025-03-01"), &items) {
                Err(ArbolError::Validation(_)) => {}
                other => panic!("expected Validation, got {other:?}"),
            }
        }
        assert_eq!(answer_count(&conn), 0);

        // The failed attempts must not consume the day's reservation
        let items = vec![AnswerItem { question_id: qs[0], value: 7 }];
        submit_batch(&mut conn, user, day("2025-03-01"), &items).expect("valid batch");
    }

    #[test]
    fn test_empty_and_duplicate_batches_rejected() {
        let mut conn = test_db();
        let (user, qs) = seed(&mut conn);

        assert!(matches!(
            submit_batch(&mut conn, user, day("2025-03-01"), &[]),
            Err(ArbolError::Validation(_))
        ));

        let dup = vec![
            AnswerItem { question_id: qs[0], value: 4 },
            AnswerItem { question_id: qs[0], value: 9 },
        ];
        assert!(matches!(
            submit_batch(&mut conn, user, day("2025-03-01"), &dup),
            Err(ArbolError::Validation(_))
        ));
        assert_eq!(answer_count(&conn), 0);
    }

    #[test]
    fn test_inactive_question_rejected() {
        let mut conn = test_db();
        let (user, qs) = seed(&mut conn);
        // Superseding the trunk question deactivates qs[0]
        questions::create(&mut conn, Category::Trunk, "Replacement", 1.0).expect("replace");

        let items = vec![AnswerItem { question_id: qs[0], value: 5 }];
        assert!(matches!(
            submit_batch(&mut conn, user, day("2025-03-01"), &items),
            Err(ArbolError::Validation(_))
        ));

        let unknown = vec![AnswerItem { question_id: 9999, value: 5 }];
        assert!(matches!(
            submit_batch(&mut conn, user, day("2025-03-01"), &unknown),
            Err(ArbolError::Validation(_))
        ));
        assert_eq!(answer_count(&conn), 0);
    }

    /// The race the participation guard exists for: concurrent submissions
    /// from the same user on the same day, through separate connections to
    /// one database file, must produce exactly one winner.
    #[test]
    fn test_concurrent_submissions_one_winner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arbol-race.db");

        let (user, question) = {
            let mut conn = crate::store::open(&path).expect("open");
            let user = users::insert(&conn, "maria", "hash", false).expect("user");
            let q = questions::create(&mut conn, Category::Trunk, "Air?", 1.0).expect("q");
            (user, q.id)
        };

        let mut conns: Vec<Connection> = (0..8)
            .map(|_| crate::store::open(&path).expect("open"))
            .collect();

        let barrier = std::sync::Arc::new(std::sync::Barrier::new(conns.len()));
        let results: Vec<_> = std::thread::scope(|s| {
            conns
                .iter_mut()
                .map(|conn| {
                    let barrier = std::sync::Arc::clone(&barrier);
                    s.spawn(move || {
                        let items = vec![AnswerItem { question_id: question, value: 7 }];
                        barrier.wait();
                        submit_batch(conn, user, day("2025-03-01"), &items)
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().expect("thread"))
                .collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(ArbolError::AlreadyParticipated)))
            .count();
        assert_eq!(winners, 1, "exactly one submission must win");
        assert_eq!(losers, results.len() - 1, "all others must observe the conflict");

        let conn = crate::store::open(&path).expect("reopen");
        assert_eq!(answer_count(&conn), 1, "no double insert");
    }
}
