//! Todoist REST v2 task source

use super::{check_status, ServiceError, TaskFilter, TaskSource};
use crate::model::Task;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

pub const TODOIST_API_URL: &str = "https://api.todoist.com/rest/v2";
const SERVICE: &str = "Todoist";

pub struct TodoistClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl TodoistClient {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base_url(api_key, TODOIST_API_URL)
    }

    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TaskSource for TodoistClient {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(project_id) = &filter.project_id {
            query.push(("project_id", project_id.clone()));
        }
        if let Some(expr) = filter.query() {
            query.push(("filter", expr));
        }
        debug!("Fetching Todoist tasks with {:?}", query);

        let response = self
            .http
            .get(format!("{}/tasks", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .query(&query)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        let tasks: Vec<Task> = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;

        let total = tasks.len();
        let tasks: Vec<Task> = tasks.into_iter().filter(|task| filter.accepts(task)).collect();
        info!("Retrieved {} tasks from Todoist ({} after filtering)", total, tasks.len());
        Ok(tasks)
    }
}
