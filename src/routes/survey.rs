//! Survey routes
//!
//! - GET  /api/questions/active - The day's prompts (public)
//! - POST /api/answers          - Submit one answer batch (authenticated)

use chrono::Utc;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::routes::respond::{
    error_response, json_response, require_token, BoxBody, SuccessResponse,
};
use crate::server::AppState;
use crate::store::AnswerItem;
use crate::types::ArbolError;

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerItem>,
}

/// GET /api/questions/active
pub async fn handle_active_questions(state: Arc<AppState>) -> Response<BoxBody> {
    match state.store.list_active_questions() {
        Ok(questions) => json_response(StatusCode::OK, &questions),
        Err(e) => error_response(e),
    }
}

/// POST /api/answers
///
/// The submitting user comes from the bearer token, never from the body.
/// The day is the server's UTC calendar date.
pub async fn handle_submit_answers(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match require_token(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    let body: SubmitAnswersRequest = match crate::routes::respond::parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let today = Utc::now().date_naive();
    match state.store.submit_answers(user_id, today, &body.answers) {
        Ok(()) => {
            info!(user_id, day = %today, count = body.answers.len(), "recorded answer batch");
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: "answers recorded".into(),
                },
            )
        }
        Err(e @ ArbolError::AlreadyParticipated) => {
            info!(user_id, day = %today, "duplicate participation attempt");
            error_response(e)
        }
        Err(e) => error_response(e),
    }
}
