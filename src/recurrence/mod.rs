//! Weekly recurrence expansion
//!
//! Turns a stored habit (an anchor start/end plus a set of weekday tags)
//! into the concrete calendar occurrences that fall inside a query window.
//! Pure functions only; callers own all I/O.

pub mod expander;
pub mod weekday;

pub use expander::{expand, ExpandError, Expansion, Occurrence, Recurring};
pub use weekday::{parse_weekday_tag, weekday_tag, WeekdaySet, WEEKDAY_TAGS};
