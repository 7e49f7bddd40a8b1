//! HTTP routes for Habitracked
//!
//! Handlers are generic over the request body so the router can be driven
//! by `hyper::body::Incoming` in the server and by `Full<Bytes>` in tests.

pub mod auth_routes;
pub mod curated;
pub mod habit_routes;
pub mod health;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use tracing::{error, warn};

use crate::auth::{extract_token_from_cookie, extract_token_from_header};
use crate::server::AppState;
use crate::types::{HabitError, Result};

pub use auth_routes::handle_auth_request;
pub use curated::handle_curated_request;
pub use habit_routes::handle_habit_request;
pub use health::{health_check, HealthResponse};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Response helpers
// =============================================================================

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

fn apply_cors(state: &AppState, headers: &mut HeaderMap) {
    if let Ok(origin) = HeaderValue::from_str(&state.args.cors_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

pub fn json_response<T: Serialize>(state: &AppState, status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    apply_cors(state, response.headers_mut());
    response
}

pub fn error_response(state: &AppState, err: HabitError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    json_response(
        state,
        status,
        &ErrorResponse {
            code: Some(err.code().to_string()),
            error: err.to_string(),
        },
    )
}

/// Collapse a handler result into a response
pub fn respond<T: Serialize>(state: &AppState, status: StatusCode, result: Result<T>) -> Response<BoxBody> {
    match result {
        Ok(body) => json_response(state, status, &body),
        Err(e) => error_response(state, e),
    }
}

pub fn cors_preflight(state: &AppState) -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    apply_cors(state, response.headers_mut());
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

pub fn method_not_allowed(state: &AppState) -> Response<BoxBody> {
    json_response(
        state,
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
    )
}

pub fn not_found_response(state: &AppState, path: &str) -> Response<BoxBody> {
    json_response(
        state,
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
            code: Some("NOT_FOUND".into()),
        },
    )
}

// =============================================================================
// Request helpers
// =============================================================================

/// Read and deserialize a JSON body no larger than `max_bytes`
pub async fn parse_json_body<T, B>(req: Request<B>, max_bytes: usize) -> Result<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Display,
{
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > max_bytes) {
        return Err(HabitError::Http("Request body too large".into()));
    }

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| HabitError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(HabitError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| HabitError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Deserialize the query string (an absent query is an empty one)
pub fn parse_query<T: DeserializeOwned, B>(req: &Request<B>) -> Result<T> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| HabitError::BadRequest(format!("Invalid query: {}", e)))
}

/// Session token from `Authorization` or, failing that, the `token` cookie
pub fn session_token<B>(req: &Request<B>) -> Option<&str> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let cookie_header = req.headers().get(header::COOKIE).and_then(|v| v.to_str().ok());

    extract_token_from_header(auth_header).or_else(|| extract_token_from_cookie(cookie_header))
}

/// Account id of the authenticated caller
pub fn require_owner<B>(state: &AppState, req: &Request<B>) -> Result<ObjectId> {
    let token = session_token(req).ok_or_else(|| HabitError::Unauthorized("No token provided".into()))?;

    let claims = state.accounts.authenticate(token).inspect_err(|e| {
        warn!(path = %req.uri().path(), "Rejected session token: {}", e);
    })?;

    ObjectId::parse_str(&claims.sub)
        .map_err(|_| HabitError::Unauthorized("Token subject is not an account id".into()))
}

/// Parse a habit id from the path. Malformed ids are reported as not found.
pub fn parse_habit_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| HabitError::NotFound(format!("Habit {} not found", raw)))
}
