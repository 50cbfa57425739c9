//! SQL schema definitions.

/// Complete schema for the arbol v1 database.
///
/// Two invariants are enforced here rather than in Rust:
/// - `idx_questions_active_category`: at most one active question per
///   category, via a partial unique index.
/// - `participations` primary key: at most one answer batch per user per
///   calendar day. Concurrent submissions race on this constraint and
///   exactly one wins.
///
/// `answers.question_id` deliberately has no ON DELETE action, so a hard
/// question delete with recorded history fails on the foreign key.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY,
    category TEXT NOT NULL CHECK (category IN ('trunk','branches','leaves')),
    text TEXT NOT NULL,
    weight REAL NOT NULL CHECK (weight > 0),
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_active_category
    ON questions(category) WHERE active = 1;

CREATE TABLE IF NOT EXISTS participations (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    submitted_on TEXT NOT NULL,
    PRIMARY KEY (user_id, submitted_on)
);

CREATE TABLE IF NOT EXISTS answers (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    question_id INTEGER NOT NULL REFERENCES questions(id),
    value INTEGER NOT NULL CHECK (value BETWEEN 1 AND 10),
    submitted_on TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id);
CREATE INDEX IF NOT EXISTS idx_answers_user ON answers(user_id);
"#;
