//! Shared types for Habitracked

pub mod error;

pub use error::{HabitError, Result};
