//! Arbol - community survey backend for the Arbol de la Vida
//!
//! Users register, authenticate, and submit one batch of daily answers
//! about the environmental quality of their surroundings. The service
//! aggregates those answers into a weighted vitality score for the
//! symbolic tree; admins manage the set of active survey questions.
//!
//! ## Components
//!
//! - **Question registry**: one active prompt per category (trunk,
//!   branches, leaves); superseded prompts stay in history.
//! - **Answer ledger**: append-only record of submitted values.
//! - **Participation guard**: at most one batch per user per UTC day,
//!   enforced by a storage constraint.
//! - **Aggregation engine**: the weighted vitality report, recomputed on
//!   every status request.

pub mod auth;
pub mod config;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;
pub mod vitality;

pub use config::Args;
pub use server::{run, AppState};
pub use store::Store;
pub use types::{ArbolError, Category, Result};
