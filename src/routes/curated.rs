//! GET /curatedHabits - public catalog, newest first

use hyper::{Method, Request, Response, StatusCode};

use crate::routes::{error_response, json_response, method_not_allowed, BoxBody};
use crate::server::AppState;
use crate::services::CuratedHabitResponse;

pub async fn handle_curated_request<B>(req: &Request<B>, state: &AppState) -> Response<BoxBody> {
    if req.method() != Method::GET {
        return method_not_allowed(state);
    }

    match state.store.list_curated().await {
        Ok(curated) => {
            let body: Vec<CuratedHabitResponse> =
                curated.iter().map(CuratedHabitResponse::from).collect();
            json_response(state, StatusCode::OK, &body)
        }
        Err(e) => error_response(state, e),
    }
}
