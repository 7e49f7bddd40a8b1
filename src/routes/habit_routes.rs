//! HTTP Routes for habits, logs and occurrences
//!
//! Every route here requires a session token. Paths:
//! - GET    /habits                                  - list the caller's habits
//! - POST   /habits, /habits/create                  - create
//! - GET    /habits/occurrences?start=&end=          - calendar of all habits
//! - GET    /habits/summary?timeframe=               - dashboard series
//! - GET    /habits/{id}                             - one habit
//! - PATCH  /habits/{id}, /habits/{id}/updateHabit   - partial update (PUT accepted)
//! - DELETE /habits/{id}, /habits/{id}/deleteHabit   - delete with its logs
//! - POST   /habits/{id}/logs, /habits/{id}/createLog
//! - GET    /habits/{id}/logs, /habits/{id}/getlogs  - `?from=&to=` filter
//! - GET    /habits/{id}/occurrences?start=&end=
//!
//! Query instants are RFC 3339; use `Z` or percent-encode a `+` offset.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;

use crate::recurrence::Occurrence;
use crate::routes::{
    error_response, method_not_allowed, not_found_response, parse_habit_id, parse_json_body,
    parse_query, require_owner, respond, BoxBody, MessageResponse,
};
use crate::server::AppState;
use crate::services::{
    DashboardSummary, HabitPatch, HabitResponse, LogResponse, NewHabit, NewLog, Timeframe,
};
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct WindowQuery {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct LogQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    timeframe: Timeframe,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create<B>(req: Request<B>, state: &AppState, owner: ObjectId) -> Result<HabitResponse>
where
    B: Body,
    B::Error: Display,
{
    let input: NewHabit = parse_json_body(req, state.args.max_body_bytes).await?;
    state.habits.create(owner, input).await
}

async fn update<B>(req: Request<B>, state: &AppState, owner: ObjectId, id: &str) -> Result<HabitResponse>
where
    B: Body,
    B::Error: Display,
{
    let habit_id = parse_habit_id(id)?;
    let patch: HabitPatch = parse_json_body(req, state.args.max_body_bytes).await?;
    state.habits.update(owner, habit_id, patch).await
}

async fn delete(state: &AppState, owner: ObjectId, id: &str) -> Result<MessageResponse> {
    let habit_id = parse_habit_id(id)?;
    state.habits.delete(owner, habit_id).await?;
    Ok(MessageResponse {
        message: "Habit deleted".into(),
    })
}

async fn create_log<B>(req: Request<B>, state: &AppState, owner: ObjectId, id: &str) -> Result<LogResponse>
where
    B: Body,
    B::Error: Display,
{
    let habit_id = parse_habit_id(id)?;
    let input: NewLog = parse_json_body(req, state.args.max_body_bytes).await?;
    state.habits.create_log(owner, habit_id, input).await
}

async fn list_logs<B>(req: &Request<B>, state: &AppState, owner: ObjectId, id: &str) -> Result<Vec<LogResponse>> {
    let habit_id = parse_habit_id(id)?;
    let query: LogQuery = parse_query(req)?;
    state
        .habits
        .list_logs(owner, habit_id, query.from, query.to)
        .await
}

async fn occurrences<B>(req: &Request<B>, state: &AppState, owner: ObjectId, id: &str) -> Result<Vec<Occurrence>> {
    let habit_id = parse_habit_id(id)?;
    let window: WindowQuery = parse_query(req)?;
    state
        .habits
        .occurrences(owner, habit_id, window.start, window.end)
        .await
}

async fn calendar<B>(req: &Request<B>, state: &AppState, owner: ObjectId) -> Result<Vec<Occurrence>> {
    let window: WindowQuery = parse_query(req)?;
    state.habits.calendar(owner, window.start, window.end).await
}

async fn summary<B>(req: &Request<B>, state: &AppState, owner: ObjectId) -> Result<DashboardSummary> {
    let query: SummaryQuery = parse_query(req)?;
    state.habits.summary(owner, query.timeframe).await
}

async fn get(state: &AppState, owner: ObjectId, id: &str) -> Result<HabitResponse> {
    state.habits.get(owner, parse_habit_id(id)?).await
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle `/habits` and everything below it
pub async fn handle_habit_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Display,
{
    let owner = match require_owner(&state, &req) {
        Ok(owner) => owner,
        Err(e) => return error_response(&state, e),
    };

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path
        .trim_start_matches("/habits")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (&method, segments.as_slice()) {
        (&Method::GET, []) => respond(&state, StatusCode::OK, state.habits.list(owner).await),
        (&Method::POST, []) | (&Method::POST, ["create"]) => {
            respond(&state, StatusCode::CREATED, create(req, &state, owner).await)
        }
        (&Method::GET, ["occurrences"]) => {
            respond(&state, StatusCode::OK, calendar(&req, &state, owner).await)
        }
        (&Method::GET, ["summary"]) => {
            respond(&state, StatusCode::OK, summary(&req, &state, owner).await)
        }
        (&Method::GET, [id]) => respond(&state, StatusCode::OK, get(&state, owner, id).await),
        (&Method::PATCH | &Method::PUT, [id]) | (&Method::PATCH | &Method::PUT, [id, "updateHabit"]) => {
            respond(&state, StatusCode::OK, update(req, &state, owner, id).await)
        }
        (&Method::DELETE, [id]) | (&Method::DELETE, [id, "deleteHabit"]) => {
            respond(&state, StatusCode::OK, delete(&state, owner, id).await)
        }
        (&Method::POST, [id, "logs"]) | (&Method::POST, [id, "createLog"]) => {
            respond(&state, StatusCode::CREATED, create_log(req, &state, owner, id).await)
        }
        (&Method::GET, [id, "logs"]) | (&Method::GET, [id, "getlogs"]) => {
            respond(&state, StatusCode::OK, list_logs(&req, &state, owner, id).await)
        }
        (&Method::GET, [id, "occurrences"]) => {
            respond(&state, StatusCode::OK, occurrences(&req, &state, owner, id).await)
        }
        (_, [] | [_])
        | (_, [_, "updateHabit" | "deleteHabit" | "logs" | "createLog" | "getlogs" | "occurrences"]) => {
            method_not_allowed(&state)
        }
        _ => not_found_response(&state, &path),
    }
}
