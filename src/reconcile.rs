//! Reconciliation of candidate events against a calendar.
//!
//! For every candidate the engine looks for an existing event whose title is
//! equivalent (see [`titles_equivalent`]) and decides between three outcomes:
//!
//! * no equivalent title: the candidate is inserted;
//! * equivalent title with the same start, end and timezones: nothing to do;
//! * equivalent title but a different schedule: the existing event is
//!   updated in place, keeping its identifier.
//!
//! The first equivalent event in listing order wins, even if a later one would
//! be an exact match. Events without a task are never touched and nothing is
//! ever deleted.
//!
//! The calendar's events are fetched once and kept in a working set. Each
//! insert or update is written back into that set, so a later task in the same
//! run sees the result without depending on the service's read-after-write
//! behavior.

use crate::model::{Event, EventDateTime};
use crate::parser::titles_equivalent;
use crate::services::{CalendarService, ServiceError};
use log::{debug, info};

/// Failure while applying a reconciliation decision
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("existing event '{0}' has no identifier and cannot be updated")]
    MissingEventId(String),
}

/// How a candidate relates to the events already on the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    New,
    /// Index into the working set of an event with the same title and schedule
    MatchedIdentical(usize),
    /// Index into the working set of an event with the same title but another schedule
    MatchedDivergent(usize),
}

/// What the engine did for one candidate; every variant holds the event as
/// the calendar now stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Created(Event),
    Updated(Event),
    Unchanged(Event),
}

impl Reconciled {
    pub fn event(&self) -> &Event {
        match self {
            Reconciled::Created(event) | Reconciled::Updated(event) | Reconciled::Unchanged(event) => event,
        }
    }
}

fn same_slot(existing: &EventDateTime, candidate: &EventDateTime) -> bool {
    let clock_matches = match (existing.naive_local(), candidate.naive_local()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    clock_matches && existing.time_zone == candidate.time_zone
}

/// Start, end and both timezones agree, comparing wall-clock values only.
pub fn same_schedule(existing: &Event, candidate: &Event) -> bool {
    same_slot(&existing.start, &candidate.start) && same_slot(&existing.end, &candidate.end)
}

/// Classify `candidate` against `existing`, first title match wins.
pub fn find_match(existing: &[Event], candidate: &Event) -> MatchState {
    let Some(index) = existing.iter().position(|event| titles_equivalent(&event.summary, &candidate.summary))
    else {
        return MatchState::New;
    };

    if same_schedule(&existing[index], candidate) {
        MatchState::MatchedIdentical(index)
    } else {
        MatchState::MatchedDivergent(index)
    }
}

pub struct Reconciler<'a, C: CalendarService + ?Sized> {
    service: &'a C,
    calendar_id: String,
    events: Vec<Event>,
}

impl<'a, C: CalendarService + ?Sized> Reconciler<'a, C> {
    /// Fetch the calendar's events once and start a working set from them.
    pub async fn load(service: &'a C, calendar_id: impl Into<String>) -> Result<Self, ServiceError> {
        let calendar_id = calendar_id.into();
        let events = service.list_events(&calendar_id).await?;
        debug!("Loaded {} existing events from calendar {}", events.len(), calendar_id);
        Ok(Self::with_events(service, calendar_id, events))
    }

    pub fn with_events(service: &'a C, calendar_id: impl Into<String>, events: Vec<Event>) -> Self {
        Self { service, calendar_id: calendar_id.into(), events }
    }

    /// Current view of the calendar, including this run's changes.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn classify(&self, candidate: &Event) -> MatchState {
        find_match(&self.events, candidate)
    }

    /// Apply the single action the candidate calls for.
    pub async fn reconcile(&mut self, candidate: Event) -> Result<Reconciled, ReconcileError> {
        match self.classify(&candidate) {
            MatchState::New => {
                let created = self.service.insert_event(&self.calendar_id, &candidate).await?;
                info!("Event created: {}", created.display_link());
                self.events.push(created.clone());
                Ok(Reconciled::Created(created))
            }
            MatchState::MatchedIdentical(index) => {
                let existing = self.events[index].clone();
                info!("Duplicate event detected: {}", existing.display_link());
                Ok(Reconciled::Unchanged(existing))
            }
            MatchState::MatchedDivergent(index) => {
                let existing = &self.events[index];
                let event_id = existing
                    .id
                    .clone()
                    .ok_or_else(|| ReconcileError::MissingEventId(existing.summary.clone()))?;
                debug!(
                    "Event {} moves from {:?} to {:?}",
                    event_id, existing.start.date_time, candidate.start.date_time
                );

                let mut replacement = candidate;
                replacement.id = Some(event_id.clone());
                let updated = self.service.update_event(&self.calendar_id, &event_id, &replacement).await?;
                info!("Event updated: {}", updated.display_link());
                self.events[index] = updated.clone();
                Ok(Reconciled::Updated(updated))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Calendar;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn slot(h: u32, m: u32, tz: &str) -> EventDateTime {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(h, m, 0).unwrap();
        EventDateTime::local(at, tz)
    }

    fn event(summary: &str, start: (u32, u32), end: (u32, u32)) -> Event {
        Event {
            summary: summary.to_string(),
            start: slot(start.0, start.1, "UTC"),
            end: slot(end.0, end.1, "UTC"),
            ..Event::default()
        }
    }

    fn stored(id: &str, mut event: Event) -> Event {
        event.id = Some(id.to_string());
        event
    }

    #[derive(Default)]
    struct RecordingCalendar {
        inserted: Mutex<Vec<Event>>,
        updated: Mutex<Vec<(String, Event)>>,
    }

    #[async_trait]
    impl CalendarService for RecordingCalendar {
        async fn ensure_calendar(&self, name: &str, _timezone: &str) -> Result<Calendar, ServiceError> {
            Ok(Calendar { id: "cal".to_string(), name: name.to_string(), timezone: None })
        }

        async fn list_events(&self, _calendar_id: &str) -> Result<Vec<Event>, ServiceError> {
            Ok(Vec::new())
        }

        async fn insert_event(&self, _calendar_id: &str, event: &Event) -> Result<Event, ServiceError> {
            let mut inserted = self.inserted.lock().unwrap();
            inserted.push(event.clone());
            Ok(stored(&format!("new-{}", inserted.len()), event.clone()))
        }

        async fn update_event(
            &self,
            _calendar_id: &str,
            event_id: &str,
            event: &Event,
        ) -> Result<Event, ServiceError> {
            self.updated.lock().unwrap().push((event_id.to_string(), event.clone()));
            Ok(event.clone())
        }
    }

    #[test]
    fn unknown_title_is_new() {
        let existing = vec![stored("a", event("Buy meat", (9, 0), (9, 30)))];
        assert_eq!(find_match(&existing, &event("Buy groceries", (9, 0), (9, 30))), MatchState::New);
    }

    #[test]
    fn same_title_and_schedule_is_identical() {
        let existing = vec![stored("a", event("Buy groceries [30m]", (9, 0), (9, 30)))];
        let candidate = event("Buy groceries [30m]", (9, 0), (9, 30));
        assert_eq!(find_match(&existing, &candidate), MatchState::MatchedIdentical(0));
    }

    #[test]
    fn changed_annotation_is_divergent() {
        let existing = vec![stored("a", event("Buy groceries [30m]", (9, 0), (9, 30)))];
        let candidate = event("Buy groceries [45m]", (9, 0), (9, 45));
        assert_eq!(find_match(&existing, &candidate), MatchState::MatchedDivergent(0));
    }

    #[test]
    fn timezone_change_is_divergent() {
        let existing = vec![stored("a", event("Call", (9, 0), (9, 30)))];
        let mut candidate = event("Call", (9, 0), (9, 30));
        candidate.end.time_zone = Some("Europe/Lisbon".to_string());
        assert_eq!(find_match(&existing, &candidate), MatchState::MatchedDivergent(0));
    }

    #[test]
    fn offsets_on_existing_events_are_ignored() {
        let mut existing = stored("a", event("Call", (9, 0), (9, 30)));
        existing.start.date_time = Some("2024-05-01T09:00:00-03:00".to_string());
        existing.end.date_time = Some("2024-05-01T09:30:00-03:00".to_string());
        assert_eq!(
            find_match(&[existing], &event("Call", (9, 0), (9, 30))),
            MatchState::MatchedIdentical(0)
        );
    }

    #[test]
    fn all_day_event_with_same_title_is_divergent() {
        let all_day = Event {
            id: Some("a".to_string()),
            summary: "Call".to_string(),
            start: EventDateTime { date: Some("2024-05-01".to_string()), ..Default::default() },
            end: EventDateTime { date: Some("2024-05-02".to_string()), ..Default::default() },
            ..Event::default()
        };
        assert_eq!(
            find_match(&[all_day], &event("Call", (9, 0), (9, 30))),
            MatchState::MatchedDivergent(0)
        );
    }

    #[test]
    fn first_title_match_wins() {
        let existing = vec![
            stored("first", event("Call [1h]", (8, 0), (9, 0))),
            stored("second", event("Call", (9, 0), (9, 30))),
        ];
        assert_eq!(
            find_match(&existing, &event("Call", (9, 0), (9, 30))),
            MatchState::MatchedDivergent(0)
        );
    }

    #[tokio::test]
    async fn creates_then_sees_its_own_insert() {
        let calendar = RecordingCalendar::default();
        let mut reconciler = Reconciler::with_events(&calendar, "cal", Vec::new());

        let first = reconciler.reconcile(event("Write report [1h]", (9, 0), (10, 0))).await.unwrap();
        let second = reconciler.reconcile(event("Write report [1h]", (9, 0), (10, 0))).await.unwrap();

        assert!(matches!(first, Reconciled::Created(_)));
        assert!(matches!(second, Reconciled::Unchanged(_)));
        assert_eq!(calendar.inserted.lock().unwrap().len(), 1);
        assert_eq!(reconciler.events().len(), 1);
    }

    #[tokio::test]
    async fn divergent_event_is_updated_in_place() {
        let calendar = RecordingCalendar::default();
        let existing = vec![
            stored("other", event("Unrelated", (7, 0), (7, 30))),
            stored("keep-me", event("Write report", (9, 0), (9, 30))),
        ];
        let mut reconciler = Reconciler::with_events(&calendar, "cal", existing);

        let outcome = reconciler.reconcile(event("Write report [1h]", (14, 0), (15, 0))).await.unwrap();

        let updated = calendar.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, "keep-me");
        assert_eq!(updated[0].1.id.as_deref(), Some("keep-me"));
        assert_eq!(updated[0].1.start.date_time.as_deref(), Some("2024-05-01T14:00:00"));
        assert!(calendar.inserted.lock().unwrap().is_empty());

        assert!(matches!(outcome, Reconciled::Updated(_)));
        assert_eq!(reconciler.events().len(), 2);
        assert_eq!(reconciler.events()[1].summary, "Write report [1h]");
        assert_eq!(reconciler.events()[0].summary, "Unrelated");
    }

    #[tokio::test]
    async fn update_without_identifier_is_an_error() {
        let calendar = RecordingCalendar::default();
        let mut reconciler =
            Reconciler::with_events(&calendar, "cal", vec![event("Write report", (9, 0), (9, 30))]);

        let err = reconciler.reconcile(event("Write report", (10, 0), (10, 30))).await.unwrap_err();
        assert!(matches!(err, ReconcileError::MissingEventId(ref title) if title == "Write report"));
    }
}
