//! Derives the calendar event that represents a scheduled task.
//!
//! Pure data transformation: no service is contacted here, so every rule
//! below is covered by the unit tests at the bottom of this file.

use crate::model::{DurationUnit, Event, EventDateTime, ReminderOverride, Reminders, Task};
use crate::parser::DurationAnnotation;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Reminder attached to every generated event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
    pub method: String,
    pub minutes_before_start: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self { method: "popup".to_string(), minutes_before_start: 15 }
    }
}

/// Values used when a task leaves something unspecified
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefaults {
    pub timezone: String,
    pub start_time: NaiveTime,
    pub reminder: ReminderPolicy,
}

impl Default for EventDefaults {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            reminder: ReminderPolicy::default(),
        }
    }
}

/// Why a task produced no event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoDueDate,
    UnparsableDueDate(String),
    DurationOutOfRange(u32),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoDueDate => write!(f, "no due date"),
            SkipReason::UnparsableDueDate(date) => write!(f, "unparsable due date '{}'", date),
            SkipReason::DurationOutOfRange(minutes) => {
                write!(f, "duration of {} minutes is out of range", minutes)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Scheduled(Event),
    Skipped(SkipReason),
}

pub struct EventBuilder {
    defaults: EventDefaults,
}

impl EventBuilder {
    pub fn new(defaults: EventDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &EventDefaults {
        &self.defaults
    }

    /// Turn a task into its candidate event.
    pub fn build(&self, task: &Task, default_duration_minutes: u32) -> BuildOutcome {
        let Some(due) = task.due.as_ref() else {
            return BuildOutcome::Skipped(SkipReason::NoDueDate);
        };
        let Some(raw_date) = due.date.as_deref() else {
            return BuildOutcome::Skipped(SkipReason::NoDueDate);
        };
        let Some(date) = parse_due_date(raw_date) else {
            return BuildOutcome::Skipped(SkipReason::UnparsableDueDate(raw_date.to_string()));
        };

        let timezone = due.timezone.clone().unwrap_or_else(|| self.defaults.timezone.clone());
        let start_time = due
            .datetime
            .as_deref()
            .and_then(|raw| {
                let time = due_time_of_day(raw, &timezone);
                if time.is_none() {
                    warn!("Task {}: ignoring unparsable due datetime '{}'", task.id, raw);
                }
                time
            })
            .unwrap_or(self.defaults.start_time);

        let start = date.and_time(start_time);
        let minutes = resolve_duration(task, default_duration_minutes);
        let Some(end) = start.checked_add_signed(Duration::minutes(i64::from(minutes))) else {
            return BuildOutcome::Skipped(SkipReason::DurationOutOfRange(minutes));
        };
        debug!("Task {}: {} -> {} ({} min, {})", task.id, start, end, minutes, timezone);

        BuildOutcome::Scheduled(Event {
            id: None,
            summary: task.content.clone(),
            description: Some(task.description.clone()),
            start: EventDateTime::local(start, timezone.clone()),
            end: EventDateTime::local(end, timezone),
            reminders: Some(Reminders {
                use_default: false,
                overrides: vec![ReminderOverride {
                    method: self.defaults.reminder.method.clone(),
                    minutes: self.defaults.reminder.minutes_before_start,
                }],
            }),
            html_link: None,
        })
    }
}

/// Structured minute duration first, then title annotations, then the default.
pub fn resolve_duration(task: &Task, default_duration_minutes: u32) -> u32 {
    if let Some(duration) = task.duration.filter(|d| d.unit == DurationUnit::Minute) {
        return duration.amount;
    }
    DurationAnnotation::scan(&task.content).usable_minutes().unwrap_or(default_duration_minutes)
}

fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_naive(raw).map(|dt| dt.date()))
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Clock time of a due datetime. Floating values are taken as written; values
/// pinned to UTC are shown in the task's timezone when it is a known zone.
fn due_time_of_day(raw: &str, timezone: &str) -> Option<NaiveTime> {
    if let Some(naive) = parse_naive(raw) {
        return Some(naive.time());
    }
    let fixed = DateTime::parse_from_rfc3339(raw).ok()?;
    match timezone.parse::<Tz>() {
        Ok(tz) => Some(fixed.with_timezone(&tz).time()),
        Err(_) => Some(fixed.naive_local().time()),
    }
}
