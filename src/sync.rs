//! One sync pass: tasks in, calendar events out.

use crate::event_builder::{BuildOutcome, EventBuilder, EventDefaults};
use crate::reconcile::{ReconcileError, Reconciled, Reconciler};
use crate::services::{CalendarService, ServiceError, TaskFilter, TaskSource};
use log::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Settings for a sync pass, resolved from the configuration file
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub calendar_name: String,
    pub default_duration_minutes: u32,
    pub filter: TaskFilter,
    pub event_defaults: EventDefaults,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            calendar_name: "Todoist Tasks".to_string(),
            default_duration_minutes: 30,
            filter: TaskFilter::default(),
            event_defaults: EventDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: &Reconciled) {
        match outcome {
            Reconciled::Created(_) => self.created += 1,
            Reconciled::Updated(_) => self.updated += 1,
            Reconciled::Unchanged(_) => self.unchanged += 1,
        }
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} skipped",
            self.created, self.updated, self.unchanged, self.skipped
        )
    }
}

pub struct SyncEngine<T: TaskSource, C: CalendarService> {
    tasks: T,
    calendar: C,
    settings: SyncSettings,
    builder: EventBuilder,
}

impl<T: TaskSource, C: CalendarService> SyncEngine<T, C> {
    pub fn new(tasks: T, calendar: C, settings: SyncSettings) -> Self {
        let builder = EventBuilder::new(settings.event_defaults.clone());
        Self { tasks, calendar, settings, builder }
    }

    pub fn tasks(&self) -> &T {
        &self.tasks
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Reconcile every task with the target calendar, one task at a time.
    ///
    /// The first service failure ends the pass; events already written stay.
    pub async fn sync_tasks_to_calendar(&self, default_duration_minutes: u32) -> Result<SyncReport, SyncError> {
        let result = self.run_pass(default_duration_minutes).await;
        match &result {
            Ok(report) => info!("Sync completed successfully: {}", report),
            Err(e) => error!("An error occurred during sync: {}", e),
        }
        result
    }

    /// Same as [`sync_tasks_to_calendar`](Self::sync_tasks_to_calendar) with
    /// the configured default duration.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        self.sync_tasks_to_calendar(self.settings.default_duration_minutes).await
    }

    async fn run_pass(&self, default_duration_minutes: u32) -> Result<SyncReport, SyncError> {
        let calendar = self
            .calendar
            .ensure_calendar(&self.settings.calendar_name, &self.builder.defaults().timezone)
            .await?;
        let tasks = self.tasks.list_tasks(&self.settings.filter).await?;
        let mut reconciler = Reconciler::load(&self.calendar, calendar.id.as_str()).await?;

        let mut report = SyncReport::default();
        for task in &tasks {
            let candidate = match self.builder.build(task, default_duration_minutes) {
                BuildOutcome::Scheduled(event) => event,
                BuildOutcome::Skipped(reason) => {
                    debug!("Skipping task {} '{}': {}", task.id, task.content, reason);
                    report.skipped += 1;
                    continue;
                }
            };
            let outcome = reconciler.reconcile(candidate).await?;
            report.record(&outcome);
        }
        Ok(report)
    }
}
