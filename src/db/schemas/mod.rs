//! Database schemas for Habitracked
//!
//! Defines MongoDB document structures for accounts, habits and curated habits.

mod curated_habit;
mod habit;
mod metadata;
mod user;

pub use curated_habit::{CuratedHabitDoc, CURATED_HABIT_COLLECTION};
pub use habit::{HabitDoc, LogEntry, TimeBlock, Visibility, HABIT_COLLECTION};
pub use metadata::Metadata;
pub use user::{UserDoc, USER_COLLECTION};
