//! In-memory store
//!
//! Used in dev mode when MongoDB is unreachable, and by the test suite.
//! Nothing survives a restart.

use bson::oid::ObjectId;
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

use super::HabitStore;
use crate::db::schemas::{CuratedHabitDoc, HabitDoc, LogEntry, Metadata, UserDoc};
use crate::types::{HabitError, Result};

/// Concurrent in-memory store
#[derive(Default)]
pub struct MemoryStore {
    /// Accounts keyed by email (the unique key)
    users: DashMap<String, UserDoc>,
    habits: DashMap<ObjectId, HabitDoc>,
    curated: DashMap<ObjectId, CuratedHabitDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn habit_count(&self) -> usize {
        self.habits.len()
    }

    pub fn curated_count(&self) -> usize {
        self.curated.len()
    }
}

#[async_trait::async_trait]
impl HabitStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(HabitError::Conflict("email is taken already".into())),
            Entry::Vacant(slot) => {
                user._id.get_or_insert_with(ObjectId::new);
                user.metadata = Metadata::new();
                slot.insert(user.clone());
                debug!(email = %user.email, "Stored account in memory");
                Ok(user)
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    async fn insert_habit(&self, mut habit: HabitDoc) -> Result<HabitDoc> {
        let id = *habit._id.get_or_insert_with(ObjectId::new);
        habit.metadata = Metadata::new();
        self.habits.insert(id, habit.clone());
        Ok(habit)
    }

    async fn list_habits(&self, owner_id: ObjectId) -> Result<Vec<HabitDoc>> {
        let mut habits: Vec<HabitDoc> = self
            .habits
            .iter()
            .filter(|h| h.owner_id == owner_id)
            .map(|h| h.clone())
            .collect();
        habits.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a._id.cmp(&b._id)));
        Ok(habits)
    }

    async fn find_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<Option<HabitDoc>> {
        Ok(self
            .habits
            .get(&habit_id)
            .filter(|h| h.owner_id == owner_id)
            .map(|h| h.clone()))
    }

    async fn update_habit(&self, owner_id: ObjectId, habit: &HabitDoc) -> Result<Option<HabitDoc>> {
        let Some(habit_id) = habit._id else {
            return Ok(None);
        };

        match self.habits.get_mut(&habit_id) {
            Some(mut stored) if stored.owner_id == owner_id => {
                stored.name = habit.name.clone();
                stored.description = habit.description.clone();
                stored.icon = habit.icon.clone();
                stored.min_time = habit.min_time;
                stored.max_time = habit.max_time;
                stored.time_block = habit.time_block;
                stored.visibility = habit.visibility;
                stored.start = habit.start;
                stored.end = habit.end;
                stored.recurrence = habit.recurrence.clone();
                stored.metadata.touch();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<bool> {
        Ok(self
            .habits
            .remove_if(&habit_id, |_, h| h.owner_id == owner_id)
            .is_some())
    }

    async fn append_log(&self, owner_id: ObjectId, habit_id: ObjectId, log: LogEntry) -> Result<bool> {
        match self.habits.get_mut(&habit_id) {
            Some(mut stored) if stored.owner_id == owner_id => {
                stored.logs.push(log);
                stored.metadata.touch();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_curated(&self, mut curated: CuratedHabitDoc) -> Result<()> {
        let id = *curated._id.get_or_insert_with(ObjectId::new);
        curated.metadata = Metadata::new();
        self.curated.insert(id, curated);
        Ok(())
    }

    async fn list_curated(&self) -> Result<Vec<CuratedHabitDoc>> {
        let mut curated: Vec<CuratedHabitDoc> = self.curated.iter().map(|c| c.clone()).collect();
        // ObjectIds start with a timestamp; descending id is newest first
        curated.sort_by(|a, b| b._id.cmp(&a._id));
        Ok(curated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Visibility;
    use chrono::{TimeZone, Utc};

    fn habit(owner: ObjectId, name: &str, hour: u32) -> HabitDoc {
        HabitDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::default(),
            owner_id: owner,
            name: name.into(),
            description: None,
            icon: None,
            min_time: 10,
            max_time: 20,
            time_block: None,
            visibility: Visibility::Private,
            start: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, hour, 30, 0).unwrap(),
            recurrence: vec![],
            logs: vec![],
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(UserDoc::new("Ada".into(), "ada@example.com".into(), "h".into()))
            .await
            .unwrap();

        let err = store
            .insert_user(UserDoc::new("Other".into(), "ada@example.com".into(), "h".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_habits_are_owner_scoped() {
        let store = MemoryStore::new();
        let alice = ObjectId::new();
        let bob = ObjectId::new();

        let h = store.insert_habit(habit(alice, "Read", 9)).await.unwrap();
        let id = h._id.unwrap();

        assert!(store.find_habit(alice, id).await.unwrap().is_some());
        assert!(store.find_habit(bob, id).await.unwrap().is_none());
        assert!(!store.delete_habit(bob, id).await.unwrap());
        assert!(!store
            .append_log(bob, id, LogEntry { date: Utc::now(), duration: 5 })
            .await
            .unwrap());
        assert!(store.delete_habit(alice, id).await.unwrap());
        assert_eq!(store.habit_count(), 0);
    }

    #[tokio::test]
    async fn test_list_sorted_by_start() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        store.insert_habit(habit(owner, "Evening", 20)).await.unwrap();
        store.insert_habit(habit(owner, "Morning", 7)).await.unwrap();
        store.insert_habit(habit(ObjectId::new(), "Someone else", 8)).await.unwrap();

        let names: Vec<_> = store
            .list_habits(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Morning", "Evening"]);
    }

    #[tokio::test]
    async fn test_update_keeps_logs_and_owner() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        let h = store.insert_habit(habit(owner, "Read", 9)).await.unwrap();
        let id = h._id.unwrap();
        store
            .append_log(owner, id, LogEntry { date: Utc::now(), duration: 15 })
            .await
            .unwrap();

        let mut edited = h.clone();
        edited.name = "Read more".into();
        edited.logs.clear();
        edited.owner_id = ObjectId::new();

        let stored = store.update_habit(owner, &edited).await.unwrap().unwrap();
        assert_eq!(stored.name, "Read more");
        assert_eq!(stored.owner_id, owner);
        assert_eq!(stored.logs.len(), 1);
    }
}
