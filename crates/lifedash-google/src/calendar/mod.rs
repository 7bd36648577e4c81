//! Calendar access on top of the token lifecycle.
//!
//! - [`CalendarApi`] lists events for a bearer token and time window;
//!   [`GoogleCalendarClient`] is the Calendar v3 implementation.
//! - [`CalendarService`] obtains a token from the validator, lists events,
//!   and recovers once from a rejected token.
//! - [`CalendarView`] is what a UI renders: events, a reconnect prompt, or a
//!   retry prompt. An error never renders as an empty calendar.

mod client;
mod service;

pub use client::GoogleCalendarClient;
pub use service::{CalendarService, CalendarView};

use chrono::NaiveDate;
use lifedash_core::{BoxFuture, EventTime, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// One calendar event, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Video call link (Meet or another conference solution).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

impl CalendarEvent {
    /// True if the event starts on `date` (UTC calendar date).
    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.start.date() == date
    }
}

/// Splits `events` into those starting on `today` and the rest, keeping order.
pub fn split_today(
    events: Vec<CalendarEvent>,
    today: NaiveDate,
) -> (Vec<CalendarEvent>, Vec<CalendarEvent>) {
    events.into_iter().partition(|e| e.starts_on(today))
}

/// Lists events visible with a bearer access token.
pub trait CalendarApi: Send + Sync {
    /// Events starting within `window`, ordered by start time.
    ///
    /// A rejected token must be reported as [`CalendarError::Unauthorized`].
    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, Result<Vec<CalendarEvent>, CalendarError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, start: EventTime) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: format!("event {}", id),
            description: None,
            location: None,
            end: start.clone(),
            start,
            html_link: None,
            status: None,
            meeting_link: None,
        }
    }

    #[test]
    fn split_today_keeps_order() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let events = vec![
            event("a", EventTime::AllDay(today)),
            event(
                "b",
                EventTime::DateTime(Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap()),
            ),
            event(
                "c",
                EventTime::DateTime(Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap()),
            ),
        ];

        let (todays, later) = split_today(events, today);
        let ids = |v: &[CalendarEvent]| v.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&todays), vec!["a", "b"]);
        assert_eq!(ids(&later), vec!["c"]);
    }

    #[test]
    fn event_json_shape() {
        let e = CalendarEvent {
            location: Some("Room 4".to_string()),
            meeting_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
            ..event(
                "evt1",
                EventTime::DateTime(Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap()),
            )
        };

        insta::assert_json_snapshot!(e, @r#"
        {
          "id": "evt1",
          "summary": "event evt1",
          "location": "Room 4",
          "start": {
            "type": "DateTime",
            "value": "2024-03-15T14:00:00Z"
          },
          "end": {
            "type": "DateTime",
            "value": "2024-03-15T14:00:00Z"
          },
          "meeting_link": "https://meet.google.com/abc-defg-hij"
        }
        "#);
    }
}
