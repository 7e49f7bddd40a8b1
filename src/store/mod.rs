//! Storage for accounts, habits, logs and the curated catalog
//!
//! `HabitStore` is the seam between services and persistence: MongoDB in
//! production, an in-memory map for dev mode and tests. Every habit
//! operation is scoped by owner; a habit owned by someone else is reported
//! exactly like a missing one.

pub mod memory;
pub mod mongo;

use bson::oid::ObjectId;

use crate::db::schemas::{CuratedHabitDoc, HabitDoc, LogEntry, UserDoc};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Storage backend used by the services
#[async_trait::async_trait]
pub trait HabitStore: Send + Sync {
    /// Short backend name for health and logs
    fn backend(&self) -> &'static str;

    /// Insert a new account. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc>;

    /// Look up an account by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    /// Insert a new habit (its `_id` is already assigned)
    async fn insert_habit(&self, habit: HabitDoc) -> Result<HabitDoc>;

    /// All habits of an owner, ordered by anchor start
    async fn list_habits(&self, owner_id: ObjectId) -> Result<Vec<HabitDoc>>;

    /// One habit of an owner
    async fn find_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<Option<HabitDoc>>;

    /// Overwrite the editable fields of an owner's habit with those of `habit`.
    ///
    /// Identity fields and logs are never written. Returns the stored habit,
    /// or `None` if the owner has no such habit.
    async fn update_habit(&self, owner_id: ObjectId, habit: &HabitDoc) -> Result<Option<HabitDoc>>;

    /// Permanently delete an owner's habit and its logs. Returns whether it existed.
    async fn delete_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<bool>;

    /// Append a log to an owner's habit. Returns whether the habit existed.
    async fn append_log(&self, owner_id: ObjectId, habit_id: ObjectId, log: LogEntry) -> Result<bool>;

    /// Add an entry to the curated catalog
    async fn insert_curated(&self, curated: CuratedHabitDoc) -> Result<()>;

    /// Curated catalog, newest first
    async fn list_curated(&self) -> Result<Vec<CuratedHabitDoc>>;
}
