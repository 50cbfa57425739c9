//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; one task per
//! connection, no framework router.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::TokenIssuer;
use crate::config::Args;
use crate::routes;
use crate::routes::respond::{cors_preflight, error_response, BoxBody};
use crate::store::Store;
use crate::types::{ArbolError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Store,
    pub tokens: TokenIssuer,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Store) -> Self {
        let tokens = TokenIssuer::new(&args.jwt_secret(), args.jwt_expiry_seconds);
        Self {
            args,
            store,
            tokens,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| ArbolError::Config(format!("cannot bind {}: {e}", state.args.listen)))?;

    info!(
        "arbol listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - using insecure default JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => cors_preflight(),

        // Identity
        (Method::POST, "/api/register") => routes::handle_register(req, state).await,
        (Method::POST, "/api/login") => routes::handle_login(req, state).await,
        (Method::POST, "/api/admin/login") => routes::handle_admin_login(req, state).await,

        // Survey
        (Method::GET, "/api/questions/active") => {
            routes::handle_active_questions(Arc::clone(&state)).await
        }
        (Method::POST, "/api/answers") => routes::handle_submit_answers(req, state).await,

        // Tree status
        (Method::GET, "/api/status") => routes::handle_status(Arc::clone(&state)).await,

        // Admin question registry
        (_, p) if is_admin_questions_path(p) => {
            routes::handle_admin_questions_request(req, Arc::clone(&state), p).await
        }

        // Method not allowed on known paths
        (_, "/api/register")
        | (_, "/api/login")
        | (_, "/api/admin/login")
        | (_, "/api/questions/active")
        | (_, "/api/answers")
        | (_, "/api/status") => crate::routes::respond::json_response(
            hyper::StatusCode::METHOD_NOT_ALLOWED,
            &crate::routes::respond::ErrorResponse {
                error: "method not allowed".into(),
                code: None,
            },
        ),

        // Not found
        (_, p) => error_response(ArbolError::NotFound(format!("no route for {p}"))),
    };

    Ok(response)
}

/// The registry collection or one of its members, nothing else.
fn is_admin_questions_path(path: &str) -> bool {
    path == "/api/admin/questions" || path.starts_with("/api/admin/questions/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_questions_path_matching() {
        assert!(is_admin_questions_path("/api/admin/questions"));
        assert!(is_admin_questions_path("/api/admin/questions/7"));

        // A stray suffix is a different resource, not a method error
        assert!(!is_admin_questions_path("/api/admin/questionsfoo"));
        assert!(!is_admin_questions_path("/api/admin/question"));
        assert!(!is_admin_questions_path("/api/questions"));
    }
}
