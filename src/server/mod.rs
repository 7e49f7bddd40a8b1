//! HTTP server for Habitracked

pub mod http;

pub use http::{route, run, AppState};
