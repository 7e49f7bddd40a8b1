//! Recurrence expansion
//!
//! Maps one habit definition plus a query window onto concrete occurrences.
//!
//! Rules:
//! - Empty recurrence: the anchor occurrence (`start`..`end` as stored) is the
//!   only occurrence and is returned whatever the window. A freshly created
//!   one-off habit is therefore always visible on the calendar; callers that
//!   want strict windowing filter the result themselves.
//! - Non-empty recurrence: walk the window day by day from the date of
//!   `range_start` through the date of `range_end`, both inclusive, and emit
//!   one occurrence on every day whose weekday is in the set. Each occurrence
//!   keeps the anchor's time of day and duration; the anchor's own date is
//!   ignored.
//!
//! All validation happens in [`expand`] before the iterator is handed out, so
//! an error never comes with partial output.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::weekday::WeekdaySet;

/// Errors raised before any expansion happens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpandError {
    /// Unknown recurrence tag or a non-positive anchor duration
    #[error("invalid habit: {0}")]
    InvalidHabit(String),

    /// `range_end` is before `range_start`
    #[error("invalid range: {0}")]
    InvalidRange(String),
}

/// A habit definition that can be expanded onto a calendar
pub trait Recurring {
    /// Stable identifier of the habit (used in occurrence keys)
    fn habit_id(&self) -> String;

    /// Start of the anchor occurrence
    fn anchor_start(&self) -> DateTime<Utc>;

    /// End of the anchor occurrence
    fn anchor_end(&self) -> DateTime<Utc>;

    /// Weekday tags the habit recurs on
    fn recurrence(&self) -> &[String];
}

/// One concrete calendar instance of a habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub habit_id: String,
    /// `"{habitId}:{YYYY-MM-DD}"`, unique across habits and days
    pub occurrence_key: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Occurrence {
    fn new(habit_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            habit_id: habit_id.to_string(),
            occurrence_key: format!("{}:{}", habit_id, start.date_naive().format("%Y-%m-%d")),
            start,
            end,
        }
    }

    /// Length of the occurrence
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Lazily produced occurrences of one habit, in ascending start order
#[derive(Debug, Clone)]
pub struct Expansion {
    habit_id: String,
    state: ExpansionState,
}

#[derive(Debug, Clone)]
enum ExpansionState {
    Anchor(Option<Occurrence>),
    Walk {
        days: WeekdaySet,
        next: Option<NaiveDate>,
        last: NaiveDate,
        time_of_day: NaiveTime,
        duration: TimeDelta,
    },
}

impl Iterator for Expansion {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        match &mut self.state {
            ExpansionState::Anchor(anchor) => anchor.take(),
            ExpansionState::Walk {
                days,
                next,
                last,
                time_of_day,
                duration,
            } => {
                while let Some(day) = *next {
                    if day > *last {
                        *next = None;
                        break;
                    }
                    *next = day.succ_opt();

                    if days.contains(day.weekday()) {
                        let start = day.and_time(*time_of_day).and_utc();
                        return Some(Occurrence::new(&self.habit_id, start, start + *duration));
                    }
                }
                None
            }
        }
    }
}

impl std::iter::FusedIterator for Expansion {}

/// Expand a habit over the window `range_start..=range_end` (by calendar day).
pub fn expand<H: Recurring + ?Sized>(
    habit: &H,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Result<Expansion, ExpandError> {
    let start = habit.anchor_start();
    let end = habit.anchor_end();
    let habit_id = habit.habit_id();

    if end <= start {
        return Err(ExpandError::InvalidHabit(format!(
            "habit {} ends ({}) at or before it starts ({})",
            habit_id,
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }

    let days = WeekdaySet::from_tags(habit.recurrence())
        .map_err(|e| ExpandError::InvalidHabit(format!("habit {}: {}", habit_id, e)))?;

    if range_end < range_start {
        return Err(ExpandError::InvalidRange(format!(
            "range end {} is before range start {}",
            range_end.to_rfc3339(),
            range_start.to_rfc3339()
        )));
    }

    let state = if days.is_empty() {
        ExpansionState::Anchor(Some(Occurrence::new(&habit_id, start, end)))
    } else {
        ExpansionState::Walk {
            days,
            next: Some(range_start.date_naive()),
            last: range_end.date_naive(),
            time_of_day: start.time(),
            duration: end - start,
        }
    };

    Ok(Expansion { habit_id, state })
}
