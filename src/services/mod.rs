//! External services the sync talks to.
//!
//! The reconciliation core only sees the [`TaskSource`] and
//! [`CalendarService`] traits; the HTTP clients for Todoist and Google
//! Calendar live in the submodules.

pub mod google_auth;
pub mod google_calendar;
pub mod todoist;

use crate::model::{Calendar, Event, Task};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Response, StatusCode};

pub use google_auth::GoogleAuth;
pub use google_calendar::GoogleCalendarClient;
pub use todoist::TodoistClient;

/// Failure talking to an external service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} is unavailable: {message}")]
    ServiceUnavailable { service: &'static str, message: String },
    #[error("{service} rejected the request credentials ({status}): {message}")]
    AuthorizationFailure { service: &'static str, status: u16, message: String },
    #[error("{service} rate limit exceeded")]
    RateLimited { service: &'static str, retry_after_secs: Option<u64> },
    #[error("unexpected response from {service}: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

impl ServiceError {
    pub(crate) fn transport(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse { service, message: err.to_string() }
        } else {
            ServiceError::ServiceUnavailable { service, message: err.to_string() }
        }
    }
}

/// Map a non-success HTTP status to the matching error kind.
pub(crate) async fn check_status(service: &'static str, response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok());
    let body = response.text().await.unwrap_or_default();
    error!("{} returned {}: {}", service, status, body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ServiceError::AuthorizationFailure { service, status: status.as_u16(), message: body }
        }
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited { service, retry_after_secs },
        _ => ServiceError::ServiceUnavailable { service, message: format!("{}: {}", status, body) },
    })
}

/// Upstream task selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub exclude_recurring: bool,
    pub exclude_subtasks: bool,
    pub project_id: Option<String>,
    pub label: Option<String>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self { exclude_recurring: true, exclude_subtasks: true, project_id: None, label: None }
    }
}

impl TaskFilter {
    /// Todoist filter query, e.g. `!recurring & !subtask & @work`
    pub fn query(&self) -> Option<String> {
        let mut clauses = Vec::new();
        if self.exclude_recurring {
            clauses.push("!recurring".to_string());
        }
        if self.exclude_subtasks {
            clauses.push("!subtask".to_string());
        }
        if let Some(label) = &self.label {
            clauses.push(format!("@{}", label));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" & "))
        }
    }

    /// Client-side guard for tasks the filter query should have excluded.
    ///
    /// Todoist ignores `project_id` whenever a filter query is sent, so the
    /// project is only enforced here.
    pub fn accepts(&self, task: &Task) -> bool {
        let in_project = match &self.project_id {
            Some(project_id) => task.project_id.as_ref() == Some(project_id),
            None => true,
        };
        let keep = in_project
            && !(self.exclude_recurring && task.is_recurring())
            && !(self.exclude_subtasks && task.is_subtask());
        if !keep {
            debug!("Dropping task {} excluded by filter", task.id);
        }
        keep
    }
}

/// Source of tasks to schedule
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError>;
}

/// Calendar the tasks are mirrored into
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Find the calendar with this name, creating it if absent.
    async fn ensure_calendar(&self, name: &str, timezone: &str) -> Result<Calendar, ServiceError>;

    /// Every event on the calendar.
    async fn list_events(&self, calendar_id: &str) -> Result<Vec<Event>, ServiceError>;

    async fn insert_event(&self, calendar_id: &str, event: &Event) -> Result<Event, ServiceError>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Due;

    #[test]
    fn default_filter_query() {
        assert_eq!(TaskFilter::default().query().as_deref(), Some("!recurring & !subtask"));
    }

    #[test]
    fn filter_query_with_label() {
        let filter = TaskFilter {
            exclude_subtasks: false,
            label: Some("calendar".to_string()),
            ..TaskFilter::default()
        };
        assert_eq!(filter.query().as_deref(), Some("!recurring & @calendar"));
    }

    #[test]
    fn empty_filter_has_no_query() {
        let filter = TaskFilter { exclude_recurring: false, exclude_subtasks: false, ..Default::default() };
        assert_eq!(filter.query(), None);
    }

    #[test]
    fn filter_drops_recurring_and_subtasks() {
        let filter = TaskFilter::default();
        let mut recurring = Task::new("1", "Water plants");
        recurring.due = Some(Due { is_recurring: true, ..Due::default() });
        let mut subtask = Task::new("2", "Step one");
        subtask.parent_id = Some("9".to_string());

        assert!(!filter.accepts(&recurring));
        assert!(!filter.accepts(&subtask));
        assert!(filter.accepts(&Task::new("3", "Plain")));
    }

    #[test]
    fn filter_keeps_only_the_configured_project() {
        let filter = TaskFilter { project_id: Some("42".to_string()), ..TaskFilter::default() };
        let mut inside = Task::new("1", "Inside");
        inside.project_id = Some("42".to_string());
        let mut elsewhere = Task::new("2", "Elsewhere");
        elsewhere.project_id = Some("99".to_string());

        assert!(filter.accepts(&inside));
        assert!(!filter.accepts(&elsewhere));
        assert!(!filter.accepts(&Task::new("3", "Unknown project")));
        assert!(TaskFilter::default().accepts(&elsewhere));
    }
}
