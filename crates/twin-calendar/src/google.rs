//! Google Calendar REST backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{Calendar, CalendarError, EventChange, EventQuery, NewEvent};

/// Base URL of the Google Calendar v3 API.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Calendar that new events are added to unless configured otherwise.
const DEFAULT_CALENDAR_ID: &str = "primary";

/// Google Calendar client authenticated with an OAuth access token.
pub struct GoogleCalendar {
    http: Client,
    base_url: String,
    access_token: Option<String>,
    calendar_id: String,
    timezone: Tz,
}

impl GoogleCalendar {
    /// Create a client. Without an access token every call fails with
    /// [`CalendarError::NotConfigured`].
    pub fn new(access_token: Option<String>, timezone: Tz) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            timezone,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Calendar that `add_calendar_event` writes to.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    fn token(&self) -> Result<&str, CalendarError> {
        self.access_token
            .as_deref()
            .ok_or(CalendarError::NotConfigured)
    }

    /// `{base}/calendars/{calendar_id}/events[/{event_id}]`, with segments escaped.
    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url, CalendarError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| CalendarError::InvalidUrl(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CalendarError::InvalidUrl(self.base_url.clone()))?;
            segments.pop_if_empty().extend(["calendars", calendar_id, "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, CalendarError> {
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(self.token()?)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    fn resolve_timezone(&self, name: Option<&str>) -> Result<Tz, CalendarError> {
        match name {
            Some(name) if !name.trim().is_empty() => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| CalendarError::InvalidTimezone(name.to_string())),
            _ => Ok(self.timezone),
        }
    }
}

#[async_trait]
impl Calendar for GoogleCalendar {
    async fn add_event(&self, event: &NewEvent) -> Result<Value, CalendarError> {
        let body = json!({
            "summary": event.event_summary,
            "location": event.event_location,
            "description": event.event_description,
            "start": {"dateTime": event.start_time, "timeZone": event.start_time_zone},
            "end": {"dateTime": event.end_time, "timeZone": event.end_time_zone},
        });

        let url = self.events_url(&self.calendar_id, None)?;
        let created = self.send(Method::POST, url, &[], Some(&body)).await?;
        debug!(event_id = ?created.get("id"), "created calendar event");

        Ok(json!({
            "status": "created",
            "event": summarize_event(&created),
        }))
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Value, CalendarError> {
        let tz = self.resolve_timezone(query.timezone.as_deref())?;

        let mut params = vec![
            ("maxResults", query.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("timeZone", tz.name().to_string()),
        ];
        if let Some(start) = &query.start_time {
            params.push(("timeMin", to_rfc3339(start, tz)?));
        }
        if let Some(end) = &query.end_time {
            params.push(("timeMax", to_rfc3339(end, tz)?));
        }

        let url = self.events_url(&query.calendar_id, None)?;
        let page = self.send(Method::GET, url, &params, None).await?;

        let events: Vec<Value> = page
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().map(summarize_event).collect())
            .unwrap_or_default();

        debug!(calendar_id = %query.calendar_id, count = events.len(), "listed calendar events");

        Ok(json!({
            "count": events.len(),
            "events": events,
        }))
    }

    async fn update_or_cancel_event(&self, change: &EventChange) -> Result<Value, CalendarError> {
        let url = self.events_url(&change.calendar_id, Some(&change.event_id))?;

        match &change.update_body {
            Some(body) => {
                let updated = self.send(Method::PATCH, url, &[], Some(body)).await?;
                Ok(json!({
                    "status": "updated",
                    "event": summarize_event(&updated),
                }))
            }
            None => {
                self.send(Method::DELETE, url, &[], None).await?;
                Ok(json!({
                    "status": "cancelled",
                    "event_id": change.event_id,
                }))
            }
        }
    }
}

/// Normalize an ISO 8601 time to RFC 3339.
///
/// Times that already carry an offset are kept as-is; naive times
/// (`YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD`) are interpreted in `tz`.
pub fn to_rfc3339(value: &str, tz: Tz) -> Result<String, CalendarError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.to_rfc3339());
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| CalendarError::InvalidTime(value.to_string()))?;

    // A time skipped by a forward DST jump is read with the offset in force
    // before the jump.
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .ok_or_else(|| CalendarError::InvalidTime(value.to_string()))?;

    Ok(local.to_rfc3339())
}

/// Keep the fields of an event the assistant needs.
fn summarize_event(event: &Value) -> Value {
    json!({
        "id": event.get("id"),
        "summary": event.get("summary"),
        "location": event.get("location"),
        "status": event.get("status"),
        "start": event.get("start"),
        "end": event.get("end"),
    })
}

/// Google API error response format.
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}
