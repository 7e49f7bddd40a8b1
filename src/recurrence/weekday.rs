//! Weekday tags as stored on habit records
//!
//! Tags are the seven lowercase English day names. A `WeekdaySet` packs a
//! recurrence pattern into seven bits (Monday = bit 0), so duplicates
//! collapse and membership checks are constant time.

use chrono::Weekday;

/// All recognized tags, Monday first
pub const WEEKDAY_TAGS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Parse a stored tag. Only the exact lowercase names are accepted.
pub fn parse_weekday_tag(tag: &str) -> Option<Weekday> {
    match tag {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Tag name for a weekday
pub fn weekday_tag(day: Weekday) -> &'static str {
    WEEKDAY_TAGS[day.num_days_from_monday() as usize]
}

/// Set of weekdays on which a habit recurs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Empty set (non-recurring)
    pub fn new() -> Self {
        Self(0)
    }

    /// Build a set from stored tags, failing on the first unrecognized one
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Result<Self, String> {
        let mut set = Self::new();
        for tag in tags {
            let tag = tag.as_ref();
            let day = parse_weekday_tag(tag)
                .ok_or_else(|| format!("unrecognized recurrence day '{}'", tag))?;
            set.insert(day);
        }
        Ok(set)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Canonical tag list (Monday first, no duplicates)
    pub fn to_tags(&self) -> Vec<String> {
        WEEKDAY_TAGS
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, tag)| tag.to_string())
            .collect()
    }
}
