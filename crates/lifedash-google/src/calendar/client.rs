//! Google Calendar v3 `events.list` client.

use chrono::{DateTime, NaiveDate, Utc};
use lifedash_core::{BoxFuture, EventTime, TimeWindow};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CalendarApi, CalendarEvent};
use crate::config::GoogleConfig;
use crate::error::CalendarError;

/// Calendar API client. Holds no token; one is passed per call.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
    calendar_id: String,
    max_results: u32,
}

impl GoogleCalendarClient {
    pub fn new(config: &GoogleConfig) -> reqwest::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            api_base: config.calendar_api_base.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            max_results: config.max_results,
        })
    }

    async fn fetch(
        &self,
        access_token: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("maxResults", self.max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CalendarError::Network("request timeout".to_string())
                } else if e.is_connect() {
                    CalendarError::Network(format!("connection failed: {}", e))
                } else {
                    CalendarError::Network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CalendarError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .map_err(|e| CalendarError::Network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(CalendarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let events = parse_event_list(&body)?;
        debug!(
            "fetched {} events from calendar {}",
            events.len(),
            self.calendar_id
        );
        Ok(events)
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, Result<Vec<CalendarEvent>, CalendarError>> {
        Box::pin(self.fetch(access_token, window))
    }
}

/// Parses an `events.list` response body, dropping cancelled or malformed
/// events.
pub(crate) fn parse_event_list(body: &str) -> Result<Vec<CalendarEvent>, CalendarError> {
    let list: EventListResponse = serde_json::from_str(body)
        .map_err(|e| CalendarError::InvalidResponse(format!("failed to parse response: {}", e)))?;
    Ok(list.items.into_iter().filter_map(convert_event).collect())
}

fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = parse_event_time(&event.start)
        .or_else(|| {
            warn!("event {} has no usable start time", id);
            None
        })?;
    let end = parse_event_time(&event.end).unwrap_or_else(|| start.clone());

    let meeting_link = event.hangout_link.or_else(|| {
        event
            .conference_data
            .and_then(|cd| cd.entry_points)
            .unwrap_or_default()
            .into_iter()
            .find(|ep| ep.entry_point_type == "video")
            .and_then(|ep| ep.uri)
    });

    Some(CalendarEvent {
        id,
        summary: event.summary.unwrap_or_default(),
        description: event.description,
        location: event.location,
        start,
        end,
        html_link: event.html_link,
        status: event.status,
        meeting_link,
    })
}

fn parse_event_time(time: &ApiEventTime) -> Option<EventTime> {
    if let Some(dt) = &time.date_time {
        return DateTime::parse_from_rfc3339(dt)
            .map_err(|e| warn!("failed to parse event time {:?}: {}", dt, e))
            .ok()
            .map(|parsed| EventTime::DateTime(parsed.with_timezone(&Utc)));
    }
    let date = time.date.as_ref()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| warn!("failed to parse event date {:?}: {}", date, e))
        .ok()
        .map(EventTime::AllDay)
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
    hangout_link: Option<String>,
    conference_data: Option<ApiConferenceData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiConferenceData {
    entry_points: Option<Vec<ApiEntryPoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEntryPoint {
    entry_point_type: String,
    uri: Option<String>,
}
