use std::collections::BTreeMap;

use chrono::NaiveTime;

use crate::error::TrackerError;
use crate::models::ScheduledSlot;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn weekday_name(day: i16) -> Option<&'static str> {
    usize::try_from(day).ok().and_then(|index| WEEKDAYS.get(index).copied())
}

/// Accepts `0`..`6` (Monday first) or a day name, full or abbreviated to
/// at least three letters.
pub fn parse_weekday(input: &str) -> Result<i16, TrackerError> {
    let value = input.trim();
    if let Ok(day) = value.parse::<i16>() {
        return weekday_name(day)
            .map(|_| day)
            .ok_or_else(|| TrackerError::Validation(format!("day of week out of range: {day}")));
    }

    let lowered = value.to_lowercase();
    if lowered.len() >= 3 {
        if let Some(index) = WEEKDAYS
            .iter()
            .position(|name| name.to_lowercase().starts_with(&lowered))
        {
            return Ok(index as i16);
        }
    }

    Err(TrackerError::Validation(format!("unknown day of week: {value}")))
}

pub fn parse_time(input: &str) -> Result<NaiveTime, TrackerError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| TrackerError::Validation(format!("expected HH:MM time, got {input}")))
}

pub fn validate_slot(day: i16, start: NaiveTime, end: NaiveTime) -> Result<(), TrackerError> {
    if weekday_name(day).is_none() {
        return Err(TrackerError::Validation(format!(
            "day of week out of range: {day}"
        )));
    }
    if start >= end {
        return Err(TrackerError::Validation(format!(
            "slot must end after it starts ({start} - {end})"
        )));
    }
    Ok(())
}

/// Weekly view: slots keyed by day of week, each day ordered by start time.
pub fn group_by_day(slots: Vec<ScheduledSlot>) -> BTreeMap<i16, Vec<ScheduledSlot>> {
    let mut days: BTreeMap<i16, Vec<ScheduledSlot>> = BTreeMap::new();
    for entry in slots {
        days.entry(entry.slot.day_of_week).or_default().push(entry);
    }
    for entries in days.values_mut() {
        entries.sort_by_key(|entry| entry.slot.start_time);
    }
    days
}
