//! Tree status route
//!
//! GET /api/status - the current vitality report, recomputed per request.

use hyper::{Response, StatusCode};
use std::sync::Arc;

use crate::routes::respond::{error_response, json_response, BoxBody};
use crate::server::AppState;

/// GET /api/status
pub async fn handle_status(state: Arc<AppState>) -> Response<BoxBody> {
    match state.store.vitality_report() {
        Ok(report) => json_response(StatusCode::OK, &report),
        Err(e) => error_response(e),
    }
}
