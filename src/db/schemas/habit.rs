//! Habit document schema
//!
//! A habit belongs to exactly one account and embeds its append-only
//! duration logs, so deleting the habit removes its logs with it.

use bson::{doc, oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{CuratedHabitDoc, Metadata};
use crate::recurrence::Recurring;

/// Collection name for habits
pub const HABIT_COLLECTION: &str = "habits";

/// Part of the day a habit is meant for
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeBlock {
    Morning,
    Afternoon,
    Evening,
}

/// Habit visibility
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    /// Mirrored into the curated catalog on creation
    Public,
}

/// One recorded session of a habit
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// When the log was recorded (server-assigned)
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,

    /// Minutes spent
    pub duration: i64,
}

/// Habit document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HabitDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning account
    pub owner_id: ObjectId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// URL or data handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Target minutes, lower bound (>= 1)
    pub min_time: i64,

    /// Target minutes, upper bound (>= min_time)
    pub max_time: i64,

    #[serde(default)]
    pub time_block: Option<TimeBlock>,

    #[serde(default)]
    pub visibility: Visibility,

    /// Anchor occurrence start
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start: DateTime<Utc>,

    /// Anchor occurrence end
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end: DateTime<Utc>,

    /// Lowercase weekday tags; empty means one-off
    #[serde(default)]
    pub recurrence: Vec<String>,

    /// Append-only duration logs
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl HabitDoc {
    /// Hex id, empty if the document was never assigned one
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Catalog copy of the display fields (no owner, no logs)
    pub fn to_curated(&self) -> CuratedHabitDoc {
        CuratedHabitDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            name: self.name.clone(),
            image: self.icon.clone(),
            description: self.description.clone(),
            min_time: self.min_time,
            max_time: self.max_time,
            time_block: self.time_block,
            start: self.start,
            end: self.end,
            recurrence: self.recurrence.clone(),
        }
    }
}

impl Recurring for HabitDoc {
    fn habit_id(&self) -> String {
        self.id_hex()
    }

    fn anchor_start(&self) -> DateTime<Utc> {
        self.start
    }

    fn anchor_end(&self) -> DateTime<Utc> {
        self.end
    }

    fn recurrence(&self) -> &[String] {
        &self.recurrence
    }
}

impl IntoIndexes for HabitDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "owner_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_id_index".to_string())
                        .build(),
                ),
            ),
            // Calendar listing sorts a user's habits by anchor start
            (
                doc! { "owner_id": 1, "start": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_start_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for HabitDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
