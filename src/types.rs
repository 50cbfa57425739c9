//! Shared types: error taxonomy and survey categories.

use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors surfaced by the arbol service.
///
/// Each variant maps to one HTTP status. Storage failures are collapsed into
/// a generic 500 at the wire; the underlying detail only reaches the log.
#[derive(Debug, thiserror::Error)]
pub enum ArbolError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("name already taken")]
    DuplicateName,

    #[error("already participated today")]
    AlreadyParticipated,

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0}")]
    Http(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ArbolError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ArbolError::Validation(_) | ArbolError::Http(_) => StatusCode::BAD_REQUEST,
            ArbolError::Auth(_) => StatusCode::UNAUTHORIZED,
            ArbolError::Forbidden(_) => StatusCode::FORBIDDEN,
            ArbolError::NotFound(_) => StatusCode::NOT_FOUND,
            ArbolError::DuplicateName
            | ArbolError::AlreadyParticipated
            | ArbolError::Conflict(_) => StatusCode::CONFLICT,
            ArbolError::Database(_) | ArbolError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the client.
    ///
    /// Validation messages are surfaced verbatim to help client-side
    /// correction; storage and config details never leave the process.
    pub fn client_message(&self) -> String {
        match self {
            ArbolError::Database(_) | ArbolError::Config(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Short machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ArbolError::Validation(_) | ArbolError::Http(_) => "VALIDATION",
            ArbolError::Auth(_) => "AUTH",
            ArbolError::Forbidden(_) => "FORBIDDEN",
            ArbolError::NotFound(_) => "NOT_FOUND",
            ArbolError::DuplicateName => "DUPLICATE_NAME",
            ArbolError::AlreadyParticipated => "ALREADY_PARTICIPATED",
            ArbolError::Conflict(_) => "CONFLICT",
            ArbolError::Database(_) | ArbolError::Config(_) => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, ArbolError>;

/// The three dimensions of the tree, one active question each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Trunk,
    Branches,
    Leaves,
}

impl Category {
    /// Canonical presentation order: trunk first, leaves last.
    pub const ALL: [Category; 3] = [Category::Trunk, Category::Branches, Category::Leaves];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Trunk => "trunk",
            Category::Branches => "branches",
            Category::Leaves => "leaves",
        }
    }

    /// Sort key following `ALL`.
    pub fn ordinal(&self) -> u8 {
        match self {
            Category::Trunk => 0,
            Category::Branches => 1,
            Category::Leaves => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ArbolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trunk" => Ok(Category::Trunk),
            "branches" => Ok(Category::Branches),
            "leaves" => Ok(Category::Leaves),
            other => Err(ArbolError::Validation(format!(
                "unknown category '{other}' (expected trunk, branches or leaves)"
            ))),
        }
    }
}

/// Inclusive bounds for an answer value.
pub const ANSWER_MIN: i64 = 1;
pub const ANSWER_MAX: i64 = 10;
