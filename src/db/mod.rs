//! Database layer for Habitracked
//!
//! Provides MongoDB storage for accounts, habits (with embedded logs) and the
//! curated habit catalog.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{CuratedHabitDoc, HabitDoc, LogEntry, Metadata, UserDoc};
