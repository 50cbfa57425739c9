//! Admin question registry routes
//!
//! All handlers here require a bearer token with the admin role:
//! - GET    /api/admin/questions      - full history
//! - POST   /api/admin/questions      - create (supersedes the category's active question)
//! - PUT    /api/admin/questions/{id} - update text and/or weight
//! - DELETE /api/admin/questions/{id} - deactivate; `?hard=true` deletes outright

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::routes::respond::{
    error_response, json_response, parse_json_body, require_admin, BoxBody, ErrorResponse,
    SuccessResponse,
};
use crate::server::AppState;
use crate::types::{ArbolError, Category};

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub category: String,
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Dispatch for `/api/admin/questions` and `/api/admin/questions/{id}`.
pub async fn handle_admin_questions_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    if let Err(e) = require_admin(&req, &state) {
        return error_response(e);
    }

    // `?hard=true` only matters to DELETE
    let query = req.uri().query().map(|q| q.to_string());

    let id_segment = path
        .strip_prefix("/api/admin/questions/")
        .filter(|s| !s.is_empty());

    match (req.method().clone(), id_segment) {
        (Method::GET, None) => handle_list(state),
        (Method::POST, None) => handle_create(req, state).await,
        (Method::PUT, Some(seg)) => match parse_id(seg) {
            Ok(id) => handle_update(req, state, id).await,
            Err(e) => error_response(e),
        },
        (Method::DELETE, Some(seg)) => match parse_id(seg) {
            Ok(id) => handle_delete(state, id, query.as_deref()),
            Err(e) => error_response(e),
        },
        _ => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "method not allowed".into(),
                code: None,
            },
        ),
    }
}

fn parse_id(segment: &str) -> Result<i64, ArbolError> {
    segment
        .parse::<i64>()
        .map_err(|_| ArbolError::Validation(format!("invalid question id '{segment}'")))
}

fn handle_list(state: Arc<AppState>) -> Response<BoxBody> {
    match state.store.list_all_questions() {
        Ok(questions) => json_response(StatusCode::OK, &questions),
        Err(e) => error_response(e),
    }
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: CreateQuestionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let category: Category = match body.category.parse() {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };

    match state
        .store
        .create_question(category, body.text.trim(), body.weight)
    {
        Ok(question) => {
            info!(id = question.id, %category, weight = question.weight, "created question");
            json_response(StatusCode::OK, &question)
        }
        Err(e) => error_response(e),
    }
}

async fn handle_update(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: i64,
) -> Response<BoxBody> {
    let body: UpdateQuestionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match state
        .store
        .update_question(id, body.text.as_deref().map(str::trim), body.weight)
    {
        Ok(question) => {
            info!(id, "updated question");
            json_response(StatusCode::OK, &question)
        }
        Err(e) => error_response(e),
    }
}

fn handle_delete(state: Arc<AppState>, id: i64, query: Option<&str>) -> Response<BoxBody> {
    let hard = query
        .map(|q| q.split('&').any(|pair| pair == "hard=true"))
        .unwrap_or(false);

    let result = if hard {
        state.store.hard_delete_question(id)
    } else {
        state.store.deactivate_question(id)
    };

    match result {
        Ok(()) => {
            info!(id, hard, "deleted question");
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: if hard {
                        "question deleted".into()
                    } else {
                        "question deactivated".into()
                    },
                },
            )
        }
        Err(e) => error_response(e),
    }
}
