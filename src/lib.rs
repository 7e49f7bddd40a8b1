//! Habitracked - habit tracking backend
//!
//! A REST service for accounts, habits, per-habit duration logs and a curated
//! habit catalog, backed by MongoDB.
//!
//! ## Modules
//!
//! - **recurrence**: expands a habit's anchor and weekday tags into calendar
//!   occurrences for a query window
//! - **store**: storage trait with MongoDB and in-memory implementations
//! - **services**: accounts, habit CRUD, logs, curated mirroring, dashboard
//! - **routes** / **server**: hyper HTTP/1 server and JSON routes

pub mod auth;
pub mod config;
pub mod db;
pub mod recurrence;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HabitError, Result};
