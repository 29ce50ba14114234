// libs/appointment-cell/src/services/duration.rs
use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::models::{parse_clock, DurationTag};

/// End time for a start time ("HH:MM") and duration choice.
///
/// Wraps around midnight. Returns an empty string when the start time is
/// missing or unparseable, or for `custom`, where the caller enters the end
/// time itself.
pub fn calculate_end_time(start_time: &str, tag: DurationTag) -> String {
    match (parse_clock(start_time), tag.minutes()) {
        (Some(start), Some(minutes)) => add_minutes(start, minutes).format("%H:%M").to_string(),
        _ => String::new(),
    }
}

pub fn add_minutes(start: NaiveTime, minutes: i64) -> NaiveTime {
    start.overflowing_add_signed(Duration::minutes(minutes)).0
}

/// Duration choice matching an existing appointment; unusual gaps map to `custom`.
pub fn tag_for_span(start: NaiveDateTime, end: NaiveDateTime) -> DurationTag {
    DurationTag::from_minutes((end - start).num_minutes())
}
