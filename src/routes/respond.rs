//! Response and request helpers shared by the route handlers.

use bytes::{Buf, BufMut, Bytes};
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{extract_token_from_header, Claims};
use crate::server::AppState;
use crate::types::{ArbolError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Maximum accepted JSON body size.
const MAX_BODY_BYTES: usize = 10240;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Map a domain error to its wire shape.
///
/// Storage details are logged here and replaced with a generic message.
pub fn error_response(err: ArbolError) -> Response<BoxBody> {
    if let ArbolError::Database(ref inner) = err {
        error!("storage failure: {inner}");
    }

    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.client_message(),
            code: Some(err.code().to_string()),
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Read and deserialize a JSON request body, with a size cap.
///
/// The cap is enforced while reading, so an oversized body is dropped as
/// soon as it crosses the limit rather than buffered in full first. A
/// `Content-Length` over the limit is rejected before reading anything.
pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    B: hyper::body::Body + Unpin,
    B::Error: std::fmt::Display,
{
    let declared_len = req
        .headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if matches!(declared_len, Some(len) if len > MAX_BODY_BYTES) {
        return Err(ArbolError::Http("request body too large".into()));
    }

    let mut body = req.into_body();
    let mut buf: Vec<u8> = Vec::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| ArbolError::Http(format!("failed to read body: {e}")))?;
        if let Ok(data) = frame.into_data() {
            if buf.len() + data.remaining() > MAX_BODY_BYTES {
                return Err(ArbolError::Http("request body too large".into()));
            }
            buf.put(data);
        }
    }

    serde_json::from_slice(&buf).map_err(|e| ArbolError::Http(format!("invalid JSON: {e}")))
}

fn auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Require a valid bearer token; returns the verified claims.
pub fn require_token(
    req: &Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Claims> {
    let token = extract_token_from_header(auth_header(req))
        .ok_or_else(|| ArbolError::Auth("missing bearer token".into()))?;
    state.tokens.verify_token(token)
}

/// Require a valid bearer token carrying the admin role.
pub fn require_admin(
    req: &Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Claims> {
    let claims = require_token(req, state)?;
    if !claims.is_admin() {
        return Err(ArbolError::Forbidden("admin access required".into()));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Echo {
        value: i64,
    }

    fn request_with_body(body: String) -> Request<Full<Bytes>> {
        Request::builder()
            .body(Full::new(Bytes::from(body)))
            .expect("request")
    }

    #[tokio::test]
    async fn test_parse_valid_body() {
        let req = request_with_body(r#"{"value": 7}"#.to_string());
        let parsed: Echo = parse_json_body(req).await.expect("parse");
        assert_eq!(parsed.value, 7);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let req = request_with_body("{not json".to_string());
        assert!(matches!(
            parse_json_body::<Echo, _>(req).await,
            Err(ArbolError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_mid_read() {
        let body = format!(r#"{{"value": {}}}"#, "1".repeat(MAX_BODY_BYTES));
        let req = request_with_body(body);
        assert!(matches!(
            parse_json_body::<Echo, _>(req).await,
            Err(ArbolError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_content_length_rejected_up_front() {
        // Nothing needs to be read for the declared length to disqualify it
        let req = Request::builder()
            .header(hyper::header::CONTENT_LENGTH, (MAX_BODY_BYTES + 1).to_string())
            .body(Full::new(Bytes::new()))
            .expect("request");
        assert!(matches!(
            parse_json_body::<Echo, _>(req).await,
            Err(ArbolError::Http(_))
        ));
    }
}
