//! Dashboard log series
//!
//! For each habit, the logs recorded in a trailing window ending now: the
//! last 7 days, the last 4 weeks or the last 12 months.

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::db::schemas::HabitDoc;
use crate::services::views::LogResponse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Week,
    Month,
    Year,
}

impl Timeframe {
    /// Start of the window that ends at `now`
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week => now - TimeDelta::days(7),
            Self::Month => now - TimeDelta::weeks(4),
            Self::Year => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSeries {
    pub habit_id: String,
    pub name: String,
    pub total_minutes: i64,
    pub points: Vec<LogResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub timeframe: Timeframe,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub habits: Vec<HabitSeries>,
}

/// Build the series for every habit. Habits without logs in the window are
/// kept with an empty series so the chart legend stays stable.
pub fn summarize(habits: &[HabitDoc], timeframe: Timeframe, now: DateTime<Utc>) -> DashboardSummary {
    let from = timeframe.window_start(now);

    let habits = habits
        .iter()
        .map(|habit| {
            let mut points: Vec<LogResponse> = habit
                .logs
                .iter()
                .filter(|log| log.date >= from && log.date <= now)
                .map(LogResponse::from)
                .collect();
            points.sort_by_key(|p| p.date);

            HabitSeries {
                habit_id: habit.id_hex(),
                name: habit.name.clone(),
                total_minutes: points
                    .iter()
                    .fold(0i64, |acc, p| acc.saturating_add(p.duration)),
                points,
            }
        })
        .collect();

    DashboardSummary {
        timeframe,
        from,
        to: now,
        habits,
    }
}
