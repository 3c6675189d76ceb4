//! Google Calendar v3 client

use super::{check_status, CalendarService, ServiceError};
use crate::model::{Calendar, Event};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

pub const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
const SERVICE: &str = "Google Calendar";
/// Largest `maxResults` each listing accepts
const CALENDAR_LIST_PAGE_SIZE: &str = "250";
const EVENTS_PAGE_SIZE: &str = "2500";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GoogleCalendarClient {
    http: Client,
    base_url: String,
    access_token: SecretString,
}

impl GoogleCalendarClient {
    pub fn new(access_token: SecretString) -> Self {
        Self::with_base_url(access_token, GOOGLE_CALENDAR_API_URL)
    }

    pub fn with_base_url(access_token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let invalid = |message: String| ServiceError::InvalidResponse { service: SERVICE, message };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(format!("bad base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("base url cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ServiceError> {
        debug!("{} {}", method, url);
        let mut request = self.http.request(method, url).bearer_auth(self.access_token.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| ServiceError::transport(SERVICE, e))?;
        check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))
    }

    /// Follow `nextPageToken` until the listing is exhausted.
    async fn list_all<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        page_size: &str,
    ) -> Result<Vec<T>, ServiceError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.endpoint(segments)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("maxResults", page_size);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let page: Page<T> = self.send(Method::GET, url, None::<&()>).await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn ensure_calendar(&self, name: &str, timezone: &str) -> Result<Calendar, ServiceError> {
        let calendars: Vec<Calendar> =
            self.list_all(&["users", "me", "calendarList"], CALENDAR_LIST_PAGE_SIZE).await?;
        if let Some(calendar) = calendars.into_iter().find(|c| c.name == name) {
            info!("Calendar '{}' already exists", name);
            return Ok(calendar);
        }

        let url = self.endpoint(&["calendars"])?;
        let body = json!({ "summary": name, "timeZone": timezone });
        let created: Calendar = self.send(Method::POST, url, Some(&body)).await?;
        info!("Calendar created: {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn list_events(&self, calendar_id: &str) -> Result<Vec<Event>, ServiceError> {
        let events: Vec<Event> = self.list_all(&["calendars", calendar_id, "events"], EVENTS_PAGE_SIZE).await?;
        debug!("Calendar {} holds {} events", calendar_id, events.len());
        Ok(events)
    }

    async fn insert_event(&self, calendar_id: &str, event: &Event) -> Result<Event, ServiceError> {
        let url = self.endpoint(&["calendars", calendar_id, "events"])?;
        self.send(Method::POST, url, Some(event)).await
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event, ServiceError> {
        let url = self.endpoint(&["calendars", calendar_id, "events", event_id])?;
        self.send(Method::PUT, url, Some(event)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_calendar_ids() {
        let client = GoogleCalendarClient::new(SecretString::from("token".to_string()));
        let url = client.endpoint(&["calendars", "abc@group.calendar.google.com", "events"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/abc@group.calendar.google.com/events"
        );

        let url = client.endpoint(&["calendars", "a/b c", "events"]).unwrap();
        assert_eq!(url.as_str(), "https://www.googleapis.com/calendar/v3/calendars/a%2Fb%20c/events");
    }
}
