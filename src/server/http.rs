//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per accepted connection.

use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes::{self, BoxBody};
use crate::services::{AccountService, HabitService};
use crate::store::HabitStore;
use crate::types::HabitError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// MongoDB in production, in-memory in dev mode without a database
    pub store: Arc<dyn HabitStore>,
    pub accounts: AccountService,
    pub habits: HabitService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn HabitStore>, jwt: JwtValidator) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(&store), jwt),
            habits: HabitService::new(Arc::clone(&store)),
            store,
            args,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), HabitError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Habitracked listening on {} as node {} ({} store)",
        state.args.listen,
        state.args.node_id,
        state.store.backend()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - fixed JWT secret in use");
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

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
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

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(route(state, req).await)
}

/// Dispatch one request to its route module
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Display,
{
    if req.method() == Method::OPTIONS {
        return routes::cors_preflight(&state);
    }

    let path = req.uri().path().to_string();

    match path.as_str() {
        "/health" | "/healthz" => routes::health_check(&state),
        "/register" | "/login" | "/logout" | "/profile" => {
            routes::handle_auth_request(req, state).await
        }
        "/curatedHabits" => routes::handle_curated_request(&req, &state).await,
        p if p == "/habits" || p.starts_with("/habits/") => {
            routes::handle_habit_request(req, state).await
        }
        _ => routes::not_found_response(&state, &path),
    }
}
