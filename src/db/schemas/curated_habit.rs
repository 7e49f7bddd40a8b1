//! Curated habit document schema
//!
//! Read-mostly catalog entries copied from public habits at creation time.

use bson::{doc, oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{Metadata, TimeBlock};

/// Collection name for curated habits
pub const CURATED_HABIT_COLLECTION: &str = "curatedHabits";

/// Curated habit document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CuratedHabitDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub min_time: i64,
    pub max_time: i64,

    #[serde(default)]
    pub time_block: Option<TimeBlock>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end: DateTime<Utc>,

    #[serde(default)]
    pub recurrence: Vec<String>,
}

impl CuratedHabitDoc {
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for CuratedHabitDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "metadata.created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("created_at_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CuratedHabitDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
