//! Business logic between the HTTP routes and the store

pub mod accounts;
pub mod dashboard;
pub mod habits;
pub mod views;

pub use accounts::{AccountService, LoginRequest, RegisterRequest, Session};
pub use dashboard::{summarize, DashboardSummary, HabitSeries, Timeframe};
pub use habits::{validate_habit, HabitPatch, HabitService, NewHabit, NewLog};
pub use views::{CuratedHabitResponse, HabitResponse, LogResponse, UserResponse};
