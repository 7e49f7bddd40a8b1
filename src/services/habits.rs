//! Habit service
//!
//! Owner-scoped habit CRUD, duration logs, curated mirroring and calendar
//! occurrences. Input is validated here before anything reaches the store;
//! recurrence tags are normalized on write (trimmed, lowercased, duplicates
//! collapsed, Monday-first order).

use bson::oid::ObjectId;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::schemas::{HabitDoc, LogEntry, Metadata, TimeBlock, Visibility};
use crate::recurrence::{expand, Occurrence, WeekdaySet};
use crate::services::dashboard::{summarize, DashboardSummary, Timeframe};
use crate::services::views::{HabitResponse, LogResponse};
use crate::store::HabitStore;
use crate::types::{HabitError, Result};

/// Body of a create request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub min_time: i64,
    pub max_time: i64,
    #[serde(default)]
    pub time_block: Option<TimeBlock>,
    #[serde(default)]
    pub visibility: Visibility,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Vec<String>,
}

/// Longest window an occurrence query may span
pub const MAX_WINDOW_DAYS: i64 = 366;

/// Body of a partial update
///
/// Only these fields can change. Anything else in the body (`id`, `ownerId`,
/// `logs`, ...) is dropped during deserialization. For the optional fields an
/// explicit `null` clears the value and a missing key leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub icon: Option<Option<String>>,
    pub min_time: Option<i64>,
    pub max_time: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub time_block: Option<Option<TimeBlock>>,
    pub visibility: Option<Visibility>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub recurrence: Option<Vec<String>>,
}

/// Present key (value or `null`) becomes `Some`; an absent key stays `None` via `default`
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl HabitPatch {
    fn apply(self, habit: &mut HabitDoc) {
        if let Some(name) = self.name {
            habit.name = name;
        }
        if let Some(description) = self.description {
            habit.description = description;
        }
        if let Some(icon) = self.icon {
            habit.icon = icon;
        }
        if let Some(min_time) = self.min_time {
            habit.min_time = min_time;
        }
        if let Some(max_time) = self.max_time {
            habit.max_time = max_time;
        }
        if let Some(time_block) = self.time_block {
            habit.time_block = time_block;
        }
        if let Some(visibility) = self.visibility {
            habit.visibility = visibility;
        }
        if let Some(start) = self.start {
            habit.start = start;
        }
        if let Some(end) = self.end {
            habit.end = end;
        }
        if let Some(recurrence) = self.recurrence {
            habit.recurrence = recurrence;
        }
    }
}

/// Body of a log append
#[derive(Debug, Clone, Deserialize)]
pub struct NewLog {
    pub duration: i64,
}

/// Check a habit's fields and normalize its recurrence tags in place
pub fn validate_habit(habit: &mut HabitDoc) -> Result<()> {
    habit.name = habit.name.trim().to_string();
    if habit.name.is_empty() {
        return Err(HabitError::InvalidHabit("name is required".into()));
    }
    if habit.min_time < 1 {
        return Err(HabitError::InvalidHabit("minTime must be at least 1".into()));
    }
    if habit.max_time < habit.min_time {
        return Err(HabitError::InvalidHabit(
            "maxTime must be greater than or equal to minTime".into(),
        ));
    }
    if habit.end <= habit.start {
        return Err(HabitError::InvalidHabit("end must be after start".into()));
    }

    let tags: Vec<String> = habit
        .recurrence
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .collect();
    habit.recurrence = WeekdaySet::from_tags(&tags)
        .map_err(HabitError::InvalidHabit)?
        .to_tags();

    Ok(())
}

/// Reject inverted windows and windows longer than `MAX_WINDOW_DAYS`
fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(HabitError::InvalidRange(format!(
            "range end {} is before range start {}",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }
    if end - start > TimeDelta::days(MAX_WINDOW_DAYS) {
        return Err(HabitError::InvalidRange(format!(
            "range spans more than {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(())
}

/// Habits, logs and occurrences of authenticated accounts
#[derive(Clone)]
pub struct HabitService {
    store: Arc<dyn HabitStore>,
}

impl HabitService {
    pub fn new(store: Arc<dyn HabitStore>) -> Self {
        Self { store }
    }

    async fn load(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<HabitDoc> {
        self.store
            .find_habit(owner_id, habit_id)
            .await?
            .ok_or_else(|| HabitError::NotFound(format!("Habit {} not found", habit_id)))
    }

    pub async fn create(&self, owner_id: ObjectId, input: NewHabit) -> Result<HabitResponse> {
        let mut habit = HabitDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            owner_id,
            name: input.name,
            description: input.description,
            icon: input.icon,
            min_time: input.min_time,
            max_time: input.max_time,
            time_block: input.time_block,
            visibility: input.visibility,
            start: input.start,
            end: input.end,
            recurrence: input.recurrence,
            logs: Vec::new(),
        };
        validate_habit(&mut habit)?;

        let habit = self.store.insert_habit(habit).await?;
        info!(habit_id = %habit.id_hex(), owner_id = %owner_id, "Habit created");

        if habit.visibility == Visibility::Public {
            self.mirror_to_curated(&habit);
        }

        Ok(HabitResponse::from(&habit))
    }

    /// Copy a public habit into the curated catalog without waiting for it
    fn mirror_to_curated(&self, habit: &HabitDoc) {
        let store = Arc::clone(&self.store);
        let curated = habit.to_curated();
        let habit_id = habit.id_hex();

        tokio::spawn(async move {
            match store.insert_curated(curated).await {
                Ok(()) => debug!(habit_id = %habit_id, "Mirrored habit into curated catalog"),
                Err(e) => warn!(habit_id = %habit_id, "Failed to mirror habit into curated catalog: {}", e),
            }
        });
    }

    pub async fn list(&self, owner_id: ObjectId) -> Result<Vec<HabitResponse>> {
        let habits = self.store.list_habits(owner_id).await?;
        Ok(habits.iter().map(HabitResponse::from).collect())
    }

    pub async fn get(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<HabitResponse> {
        Ok(HabitResponse::from(&self.load(owner_id, habit_id).await?))
    }

    /// Merge an allow-listed patch into the stored habit, validate, and save
    pub async fn update(
        &self,
        owner_id: ObjectId,
        habit_id: ObjectId,
        patch: HabitPatch,
    ) -> Result<HabitResponse> {
        let mut habit = self.load(owner_id, habit_id).await?;
        patch.apply(&mut habit);
        validate_habit(&mut habit)?;

        let stored = self
            .store
            .update_habit(owner_id, &habit)
            .await?
            .ok_or_else(|| HabitError::NotFound(format!("Habit {} not found", habit_id)))?;

        info!(habit_id = %habit_id, "Habit updated");
        Ok(HabitResponse::from(&stored))
    }

    pub async fn delete(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<()> {
        if !self.store.delete_habit(owner_id, habit_id).await? {
            return Err(HabitError::NotFound(format!("Habit {} not found", habit_id)));
        }
        info!(habit_id = %habit_id, "Habit deleted");
        Ok(())
    }

    /// Append a server-dated log
    pub async fn create_log(
        &self,
        owner_id: ObjectId,
        habit_id: ObjectId,
        input: NewLog,
    ) -> Result<LogResponse> {
        if input.duration < 0 {
            return Err(HabitError::BadRequest("duration must not be negative".into()));
        }

        let log = LogEntry {
            date: Utc::now(),
            duration: input.duration,
        };
        if !self.store.append_log(owner_id, habit_id, log.clone()).await? {
            return Err(HabitError::NotFound(format!("Habit {} not found", habit_id)));
        }

        debug!(habit_id = %habit_id, duration = log.duration, "Log appended");
        Ok(LogResponse::from(&log))
    }

    /// Logs of one habit within `[from, to]`, oldest first
    pub async fn list_logs(
        &self,
        owner_id: ObjectId,
        habit_id: ObjectId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<LogResponse>> {
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(HabitError::InvalidRange("'to' is before 'from'".into()));
            }
        }

        let habit = self.load(owner_id, habit_id).await?;
        let mut logs: Vec<LogResponse> = habit
            .logs
            .iter()
            .filter(|log| from.map_or(true, |from| log.date >= from))
            .filter(|log| to.map_or(true, |to| log.date <= to))
            .map(LogResponse::from)
            .collect();
        logs.sort_by_key(|log| log.date);
        Ok(logs)
    }

    /// Occurrences of one habit inside the window
    pub async fn occurrences(
        &self,
        owner_id: ObjectId,
        habit_id: ObjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>> {
        check_window(start, end)?;
        let habit = self.load(owner_id, habit_id).await?;
        Ok(expand(&habit, start, end)?.collect())
    }

    /// Occurrences of all the owner's habits, merged in start order.
    ///
    /// A stored habit that no longer expands (for example a tag written before
    /// validation existed) is skipped with a warning instead of failing the
    /// whole calendar.
    pub async fn calendar(
        &self,
        owner_id: ObjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>> {
        check_window(start, end)?;

        let mut occurrences = Vec::new();
        for habit in self.store.list_habits(owner_id).await? {
            match expand(&habit, start, end) {
                Ok(expansion) => occurrences.extend(expansion),
                Err(e) => warn!(habit_id = %habit.id_hex(), "Skipping habit on calendar: {}", e),
            }
        }

        occurrences.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.habit_id.cmp(&b.habit_id))
        });
        Ok(occurrences)
    }

    /// Dashboard series over a trailing timeframe ending now
    pub async fn summary(&self, owner_id: ObjectId, timeframe: Timeframe) -> Result<DashboardSummary> {
        let habits = self.store.list_habits(owner_id).await?;
        Ok(summarize(&habits, timeframe, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn new_habit(recurrence: &[&str]) -> NewHabit {
        NewHabit {
            name: "Morning run".into(),
            description: None,
            icon: None,
            min_time: 20,
            max_time: 40,
            time_block: Some(TimeBlock::Morning),
            visibility: Visibility::Private,
            start: at(2024, 1, 1, 7, 0),
            end: at(2024, 1, 1, 7, 30),
            recurrence: recurrence.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn setup() -> (Arc<MemoryStore>, HabitService) {
        let store = Arc::new(MemoryStore::new());
        let service = HabitService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_create_normalizes_recurrence() {
        let (_, habits) = setup();
        let created = habits
            .create(ObjectId::new(), new_habit(&["Friday", "monday", " monday "]))
            .await
            .unwrap();
        assert_eq!(created.recurrence, vec!["monday", "friday"]);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (_, habits) = setup();
        let owner = ObjectId::new();

        let mut input = new_habit(&[]);
        input.min_time = 0;
        assert!(matches!(
            habits.create(owner, input).await,
            Err(HabitError::InvalidHabit(_))
        ));

        let mut input = new_habit(&[]);
        input.max_time = 10;
        assert!(matches!(
            habits.create(owner, input).await,
            Err(HabitError::InvalidHabit(_))
        ));

        let mut input = new_habit(&[]);
        input.end = input.start;
        assert!(matches!(
            habits.create(owner, input).await,
            Err(HabitError::InvalidHabit(_))
        ));

        assert!(matches!(
            habits.create(owner, new_habit(&["funday"])).await,
            Err(HabitError::InvalidHabit(_))
        ));

        let mut input = new_habit(&[]);
        input.name = "   ".into();
        assert!(matches!(
            habits.create(owner, input).await,
            Err(HabitError::InvalidHabit(_))
        ));
    }

    #[tokio::test]
    async fn test_update_applies_patch_and_revalidates() {
        let (_, habits) = setup();
        let owner = ObjectId::new();
        let created = habits.create(owner, new_habit(&["monday"])).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        let patch = HabitPatch {
            name: Some("Evening run".into()),
            recurrence: Some(vec!["sunday".into(), "tuesday".into()]),
            ..Default::default()
        };
        let updated = habits.update(owner, id, patch).await.unwrap();
        assert_eq!(updated.name, "Evening run");
        assert_eq!(updated.recurrence, vec!["tuesday", "sunday"]);
        assert_eq!(updated.min_time, 20);

        let bad = HabitPatch {
            max_time: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            habits.update(owner, id, bad).await,
            Err(HabitError::InvalidHabit(_))
        ));
        assert_eq!(habits.get(owner, id).await.unwrap().max_time, 40);
    }

    #[tokio::test]
    async fn test_patch_null_clears_optional_fields() {
        let (_, habits) = setup();
        let owner = ObjectId::new();
        let mut input = new_habit(&[]);
        input.description = Some("5k loop".into());
        input.icon = Some("run.png".into());
        let created = habits.create(owner, input).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        let untouched: HabitPatch = serde_json::from_str(r#"{"name": "Jog"}"#).unwrap();
        let updated = habits.update(owner, id, untouched).await.unwrap();
        assert_eq!(updated.description.as_deref(), Some("5k loop"));
        assert_eq!(updated.time_block, Some(TimeBlock::Morning));

        let clearing: HabitPatch =
            serde_json::from_str(r#"{"description": null, "icon": null, "timeBlock": null}"#).unwrap();
        let updated = habits.update(owner, id, clearing).await.unwrap();
        assert_eq!(updated.name, "Jog");
        assert_eq!(updated.description, None);
        assert_eq!(updated.icon, None);
        assert_eq!(updated.time_block, None);
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let (_, habits) = setup();
        let owner = ObjectId::new();
        let intruder = ObjectId::new();
        let created = habits.create(owner, new_habit(&[])).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        assert!(matches!(habits.get(intruder, id).await, Err(HabitError::NotFound(_))));
        assert!(matches!(
            habits.update(intruder, id, HabitPatch::default()).await,
            Err(HabitError::NotFound(_))
        ));
        assert!(matches!(habits.delete(intruder, id).await, Err(HabitError::NotFound(_))));
        assert!(matches!(
            habits.create_log(intruder, id, NewLog { duration: 5 }).await,
            Err(HabitError::NotFound(_))
        ));

        habits.delete(owner, id).await.unwrap();
        assert!(matches!(habits.get(owner, id).await, Err(HabitError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_logs_append_and_filter() {
        let (_, habits) = setup();
        let owner = ObjectId::new();
        let created = habits.create(owner, new_habit(&[])).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        assert!(matches!(
            habits.create_log(owner, id, NewLog { duration: -1 }).await,
            Err(HabitError::BadRequest(_))
        ));

        let before = Utc::now();
        let first = habits.create_log(owner, id, NewLog { duration: 0 }).await.unwrap();
        let second = habits.create_log(owner, id, NewLog { duration: 25 }).await.unwrap();
        assert!(first.date >= before);

        let all = habits.list_logs(owner, id, None, None).await.unwrap();
        assert_eq!(all, vec![first.clone(), second.clone()]);

        let later = habits
            .list_logs(owner, id, Some(Utc::now() + chrono::TimeDelta::hours(1)), None)
            .await
            .unwrap();
        assert!(later.is_empty());

        assert!(matches!(
            habits
                .list_logs(owner, id, Some(Utc::now()), Some(before - chrono::TimeDelta::days(1)))
                .await,
            Err(HabitError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn test_calendar_merges_habits_in_start_order() {
        let (_, habits) = setup();
        let owner = ObjectId::new();

        habits.create(owner, new_habit(&["monday", "wednesday"])).await.unwrap();
        let mut reading = new_habit(&[]);
        reading.name = "Read".into();
        reading.start = at(2024, 1, 2, 21, 0);
        reading.end = at(2024, 1, 2, 21, 45);
        habits.create(owner, reading).await.unwrap();
        habits
            .create(ObjectId::new(), new_habit(&["tuesday"]))
            .await
            .unwrap();

        let occurrences = habits
            .calendar(owner, at(2024, 1, 1, 0, 0), at(2024, 1, 7, 0, 0))
            .await
            .unwrap();

        let starts: Vec<_> = occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![at(2024, 1, 1, 7, 0), at(2024, 1, 2, 21, 0), at(2024, 1, 3, 7, 0)]
        );

        assert!(matches!(
            habits
                .calendar(owner, at(2024, 1, 7, 0, 0), at(2024, 1, 1, 0, 0))
                .await,
            Err(HabitError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn test_windows_longer_than_a_year_are_rejected() {
        let (_, habits) = setup();
        let owner = ObjectId::new();
        let created = habits
            .create(owner, new_habit(&["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"]))
            .await
            .unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        let start = at(2024, 1, 1, 0, 0);
        let full_year = habits
            .calendar(owner, start, start + TimeDelta::days(MAX_WINDOW_DAYS))
            .await
            .unwrap();
        assert_eq!(full_year.len(), 367);

        let too_long = start + TimeDelta::days(MAX_WINDOW_DAYS) + TimeDelta::seconds(1);
        assert!(matches!(
            habits.calendar(owner, start, too_long).await,
            Err(HabitError::InvalidRange(_))
        ));
        assert!(matches!(
            habits.occurrences(owner, id, start, too_long).await,
            Err(HabitError::InvalidRange(_))
        ));
        assert!(matches!(
            habits.calendar(owner, at(1, 1, 1, 0, 0), at(9999, 12, 31, 0, 0)).await,
            Err(HabitError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_total_survives_huge_durations() {
        let (_, habits) = setup();
        let owner = ObjectId::new();
        let created = habits.create(owner, new_habit(&[])).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        habits.create_log(owner, id, NewLog { duration: i64::MAX }).await.unwrap();
        habits.create_log(owner, id, NewLog { duration: 1 }).await.unwrap();

        let summary = habits.summary(owner, Timeframe::Week).await.unwrap();
        assert_eq!(summary.habits[0].total_minutes, i64::MAX);
    }

    #[tokio::test]
    async fn test_calendar_skips_unexpandable_habits() {
        let (store, habits) = setup();
        let owner = ObjectId::new();
        habits.create(owner, new_habit(&["monday"])).await.unwrap();

        // Written straight to the store, bypassing validation
        let legacy = HabitDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::default(),
            owner_id: owner,
            name: "Legacy habit".into(),
            description: None,
            icon: None,
            min_time: 1,
            max_time: 1,
            time_block: None,
            visibility: Visibility::Private,
            start: at(2024, 1, 1, 9, 0),
            end: at(2024, 1, 1, 10, 0),
            recurrence: vec!["funday".into()],
            logs: vec![],
        };
        store.insert_habit(legacy).await.unwrap();

        let occurrences = habits
            .calendar(owner, at(2024, 1, 1, 0, 0), at(2024, 1, 7, 0, 0))
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 1);
    }

    #[tokio::test]
    async fn test_public_habit_is_mirrored() {
        let (store, habits) = setup();
        let mut input = new_habit(&["saturday"]);
        input.visibility = Visibility::Public;
        input.icon = Some("run.png".into());
        habits.create(ObjectId::new(), input).await.unwrap();
        habits.create(ObjectId::new(), new_habit(&[])).await.unwrap();

        for _ in 0..100 {
            if store.curated_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let curated = store.list_curated().await.unwrap();
        assert_eq!(curated.len(), 1);
        assert_eq!(curated[0].image.as_deref(), Some("run.png"));
        assert_eq!(curated[0].recurrence, vec!["saturday"]);
    }
}
