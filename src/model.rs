//! Records exchanged with the task and calendar services.
//!
//! Field names follow the Todoist REST v2 and Google Calendar v3 JSON shapes so
//! the same structs serve as domain types and wire types.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Format used for naive local date-times sent to the calendar
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default)]
    pub duration: Option<TaskDuration>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Due {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDuration {
    pub amount: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minute,
    Day,
    #[serde(other)]
    Other,
}

impl Task {
    /// Build a task with only the fields the scheduler cares about.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            description: String::new(),
            due: None,
            duration: None,
            project_id: None,
            parent_id: None,
        }
    }

    pub fn with_due_date(mut self, date: impl Into<String>) -> Self {
        let due = self.due.get_or_insert_with(Due::default);
        due.date = Some(date.into());
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.due.as_ref().is_some_and(|due| due.is_recurring)
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// All-day events carry a date instead of a date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn local(at: NaiveDateTime, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(at.format(LOCAL_DATETIME_FORMAT).to_string()),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }

    /// Wall-clock value of `date_time`, dropping any UTC offset it carries.
    pub fn naive_local(&self) -> Option<NaiveDateTime> {
        let raw = self.date_time.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default)]
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
    #[serde(default, skip_serializing)]
    pub html_link: Option<String>,
}

impl Event {
    /// Link shown in logs, falling back to the identifier.
    pub fn display_link(&self) -> &str {
        self.html_link.as_deref().or(self.id.as_deref()).unwrap_or(self.summary.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    #[serde(rename = "summary")]
    pub name: String,
    #[serde(rename = "timeZone", default)]
    pub timezone: Option<String>,
}
