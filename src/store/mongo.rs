//! MongoDB-backed store

use bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime};
use tracing::{debug, info};

use super::HabitStore;
use crate::db::schemas::{
    CuratedHabitDoc, HabitDoc, LogEntry, UserDoc, CURATED_HABIT_COLLECTION, HABIT_COLLECTION,
    USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{HabitError, Result};

/// Store over the `users`, `habits` and `curatedHabits` collections
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    habits: MongoCollection<HabitDoc>,
    curated: MongoCollection<CuratedHabitDoc>,
}

impl MongoStore {
    /// Open the collections and apply their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let users = client.collection::<UserDoc>(USER_COLLECTION).await?;
        let habits = client.collection::<HabitDoc>(HABIT_COLLECTION).await?;
        let curated = client
            .collection::<CuratedHabitDoc>(CURATED_HABIT_COLLECTION)
            .await?;

        info!(db = client.db_name(), "MongoDB collections ready");

        Ok(Self {
            users,
            habits,
            curated,
        })
    }
}

fn to_bson<T: serde::Serialize>(value: &T) -> Result<Bson> {
    bson::to_bson(value).map_err(|e| HabitError::Internal(format!("BSON encode failed: {}", e)))
}

#[async_trait::async_trait]
impl HabitStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = self.users.insert_one(user.clone()).await.map_err(|e| match e {
            HabitError::Conflict(_) => HabitError::Conflict("email is taken already".into()),
            other => other,
        })?;
        user._id = Some(id);
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn insert_habit(&self, mut habit: HabitDoc) -> Result<HabitDoc> {
        let id = self.habits.insert_one(habit.clone()).await?;
        habit._id = Some(id);
        debug!(habit_id = %id, "Inserted habit");
        Ok(habit)
    }

    async fn list_habits(&self, owner_id: ObjectId) -> Result<Vec<HabitDoc>> {
        self.habits
            .find_many(doc! { "owner_id": owner_id }, Some(doc! { "start": 1, "_id": 1 }))
            .await
    }

    async fn find_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<Option<HabitDoc>> {
        self.habits
            .find_one(doc! { "_id": habit_id, "owner_id": owner_id })
            .await
    }

    async fn update_habit(&self, owner_id: ObjectId, habit: &HabitDoc) -> Result<Option<HabitDoc>> {
        let Some(habit_id) = habit._id else {
            return Ok(None);
        };

        let set = doc! {
            "name": habit.name.clone(),
            "description": to_bson(&habit.description)?,
            "icon": to_bson(&habit.icon)?,
            "min_time": habit.min_time,
            "max_time": habit.max_time,
            "time_block": to_bson(&habit.time_block)?,
            "visibility": to_bson(&habit.visibility)?,
            "start": BsonDateTime::from_chrono(habit.start),
            "end": BsonDateTime::from_chrono(habit.end),
            "recurrence": habit.recurrence.clone(),
        };

        self.habits
            .find_one_and_update(
                doc! { "_id": habit_id, "owner_id": owner_id },
                doc! { "$set": set },
            )
            .await
    }

    async fn delete_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<bool> {
        let result = self
            .habits
            .delete_one(doc! { "_id": habit_id, "owner_id": owner_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn append_log(&self, owner_id: ObjectId, habit_id: ObjectId, log: LogEntry) -> Result<bool> {
        let result = self
            .habits
            .update_one(
                doc! { "_id": habit_id, "owner_id": owner_id },
                doc! {
                    "$push": { "logs": to_bson(&log)? },
                    "$set": { "metadata.updated_at": BsonDateTime::now() },
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn insert_curated(&self, curated: CuratedHabitDoc) -> Result<()> {
        self.curated.insert_one(curated).await?;
        Ok(())
    }

    async fn list_curated(&self) -> Result<Vec<CuratedHabitDoc>> {
        self.curated
            .find_many(doc! {}, Some(doc! { "metadata.created_at": -1 }))
            .await
    }
}
