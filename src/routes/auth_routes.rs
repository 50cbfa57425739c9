//! Registration and login routes
//!
//! - POST /api/register    - Create an account
//! - POST /api/login       - Authenticate and get a JWT token
//! - POST /api/admin/login - Same, but the account must be an admin

use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{verify_password, PermissionLevel};
use crate::routes::respond::{error_response, json_response, parse_json_body, BoxBody};
use crate::server::AppState;
use crate::store::User;
use crate::types::{ArbolError, Result};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub name: String,
    pub is_admin: bool,
    pub expires_at: u64,
}

/// POST /api/register
pub async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let name = body.name.trim();
    let password = body.password.trim();
    if name.is_empty() || password.is_empty() {
        return error_response(ArbolError::Validation(
            "name and password must not be empty".into(),
        ));
    }

    let hash = match crate::auth::hash_password(password) {
        Ok(h) => h,
        Err(e) => return error_response(e),
    };

    match state.store.create_user(name, &hash) {
        Ok(user_id) => {
            info!(user_id, name, "registered new user");
            json_response(StatusCode::OK, &RegisterResponse { user_id })
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/login
pub async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    match login_flow(req, &state).await {
        Ok(response) => response,
        Err(e) => error_response(e),
    }
}

/// POST /api/admin/login
///
/// Identical to login, except non-admin accounts are refused. Gives admin
/// frontends a dedicated endpoint without a second credential store.
pub async fn handle_admin_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let result = async {
        let user = authenticate(req, &state).await?;
        if !user.is_admin {
            warn!(name = %user.name, "admin login refused for non-admin account");
            return Err(ArbolError::Forbidden("admin account required".into()));
        }
        issue_token(&state, &user)
    }
    .await;

    match result {
        Ok(response) => response,
        Err(e) => error_response(e),
    }
}

async fn login_flow(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>> {
    let user = authenticate(req, state).await?;
    issue_token(state, &user)
}

/// Check credentials against the user table.
///
/// Unknown names and wrong passwords produce the same error, so the
/// response does not reveal which names exist.
async fn authenticate(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<User> {
    let body: LoginRequest = parse_json_body(req).await?;
    let name = body.name.trim();
    let password = body.password.trim();

    let user = state
        .store
        .find_user_by_name(name)?
        .ok_or_else(|| ArbolError::Auth("invalid credentials".into()))?;

    if !verify_password(password, &user.password_hash)? {
        warn!(name, "failed login attempt");
        return Err(ArbolError::Auth("invalid credentials".into()));
    }

    Ok(user)
}

fn issue_token(state: &AppState, user: &User) -> Result<Response<BoxBody>> {
    let role = if user.is_admin {
        PermissionLevel::Admin
    } else {
        PermissionLevel::Authenticated
    };

    let (token, claims) = state.tokens.generate_token(user.id, &user.name, role)?;
    info!(user_id = user.id, name = %user.name, %role, "issued token");

    Ok(json_response(
        StatusCode::OK,
        &AuthResponse {
            token,
            user_id: user.id,
            name: user.name.clone(),
            is_admin: user.is_admin,
            expires_at: claims.exp,
        },
    ))
}
