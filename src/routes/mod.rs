//! HTTP routes for arbol

pub mod admin;
pub mod auth_routes;
pub mod health;
pub mod respond;
pub mod status;
pub mod survey;

pub use admin::handle_admin_questions_request;
pub use auth_routes::{handle_admin_login, handle_login, handle_register};
pub use health::{health_check, version_info};
pub use status::handle_status;
pub use survey::{handle_active_questions, handle_submit_answers};
