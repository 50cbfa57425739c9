//! Permission levels carried in auth tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission levels for arbol routes.
///
/// Ordered so that a level check is a plain comparison: an admin token
/// satisfies any `Authenticated` gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PermissionLevel {
    /// No authentication - read-only endpoints (active questions, status)
    #[default]
    Public = 0,
    /// Registered user - answer submission
    Authenticated = 1,
    /// Admin - question registry management
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Public => write!(f, "PUBLIC"),
            PermissionLevel::Authenticated => write!(f, "AUTHENTICATED"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}
