//! HTTP Routes for Authentication
//!
//! - POST /register - Create an account
//! - POST /login    - Verify credentials, set the `token` cookie, return the token
//! - POST /logout   - Clear the `token` cookie (tokens are stateless)
//! - GET  /profile  - Claims of the current session, or `null` without one

use hyper::body::Body;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::TOKEN_COOKIE;
use crate::routes::{
    error_response, json_response, method_not_allowed, not_found_response, parse_json_body, respond,
    session_token, BoxBody, MessageResponse,
};
use crate::server::AppState;
use crate::services::{LoginRequest, RegisterRequest};

fn session_cookie(token: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, max_age
    )
}

fn set_cookie(response: &mut Response<BoxBody>, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
}

/// POST /register
async fn handle_register<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Display,
{
    let body: RegisterRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&state, e),
    };

    respond(&state, StatusCode::CREATED, state.accounts.register(body).await)
}

/// POST /login
async fn handle_login<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Display,
{
    let body: LoginRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&state, e),
    };

    match state.accounts.login(body).await {
        Ok(session) => {
            let cookie = session_cookie(&session.token, state.accounts.jwt().expiry_seconds());
            let mut response = json_response(&state, StatusCode::OK, &session);
            set_cookie(&mut response, &cookie);
            response
        }
        Err(e) => error_response(&state, e),
    }
}

/// POST /logout
fn handle_logout(state: &AppState) -> Response<BoxBody> {
    let mut response = json_response(
        state,
        StatusCode::OK,
        &MessageResponse {
            message: "Logged out successfully".into(),
        },
    );
    set_cookie(&mut response, &session_cookie("", 0));
    info!("Session cookie cleared");
    response
}

/// GET /profile
///
/// No token answers `null` (a signed-out visitor); a bad token is a 401.
fn handle_profile<B>(req: &Request<B>, state: &AppState) -> Response<BoxBody> {
    let Some(token) = session_token(req) else {
        return json_response(state, StatusCode::OK, &serde_json::Value::Null);
    };

    match state.accounts.authenticate(token) {
        Ok(claims) => json_response(state, StatusCode::OK, &claims),
        Err(e) => {
            warn!("Profile request with invalid token: {}", e);
            error_response(state, e)
        }
    }
}

/// Handle account and session requests
pub async fn handle_auth_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Display,
{
    let path = req.uri().path().to_string();

    match (req.method(), path.as_str()) {
        (&Method::POST, "/register") => handle_register(req, state).await,
        (&Method::POST, "/login") => handle_login(req, state).await,
        (&Method::POST, "/logout") => handle_logout(&state),
        (&Method::GET, "/profile") => handle_profile(&req, &state),
        (_, "/register") | (_, "/login") | (_, "/logout") | (_, "/profile") => {
            method_not_allowed(&state)
        }
        _ => not_found_response(&state, &path),
    }
}
