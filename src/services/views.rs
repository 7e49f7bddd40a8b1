//! JSON views of stored documents
//!
//! Storage uses snake_case fields and ObjectIds; the wire uses camelCase and
//! hex ids. Password hashes never leave the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::schemas::{CuratedHabitDoc, HabitDoc, LogEntry, TimeBlock, UserDoc, Visibility};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&UserDoc> for UserResponse {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub date: DateTime<Utc>,
    pub duration: i64,
}

impl From<&LogEntry> for LogResponse {
    fn from(log: &LogEntry) -> Self {
        Self {
            date: log.date,
            duration: log.duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub min_time: i64,
    pub max_time: i64,
    pub time_block: Option<TimeBlock>,
    pub visibility: Visibility,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub recurrence: Vec<String>,
    pub logs: Vec<LogResponse>,
}

impl From<&HabitDoc> for HabitResponse {
    fn from(habit: &HabitDoc) -> Self {
        Self {
            id: habit.id_hex(),
            owner_id: habit.owner_id.to_hex(),
            name: habit.name.clone(),
            description: habit.description.clone(),
            icon: habit.icon.clone(),
            min_time: habit.min_time,
            max_time: habit.max_time,
            time_block: habit.time_block,
            visibility: habit.visibility,
            start: habit.start,
            end: habit.end,
            recurrence: habit.recurrence.clone(),
            logs: habit.logs.iter().map(LogResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedHabitResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub min_time: i64,
    pub max_time: i64,
    pub time_block: Option<TimeBlock>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub recurrence: Vec<String>,
}

impl From<&CuratedHabitDoc> for CuratedHabitResponse {
    fn from(curated: &CuratedHabitDoc) -> Self {
        Self {
            id: curated.id_hex(),
            name: curated.name.clone(),
            image: curated.image.clone(),
            description: curated.description.clone(),
            min_time: curated.min_time,
            max_time: curated.max_time,
            time_block: curated.time_block,
            start: curated.start,
            end: curated.end,
            recurrence: curated.recurrence.clone(),
        }
    }
}
