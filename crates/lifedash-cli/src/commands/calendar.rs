//! Upcoming events command.

use chrono::{Local, NaiveDate};
use lifedash_core::EventTime;
use lifedash_google::{CalendarEvent, CalendarView, split_today};

use crate::error::{ClientError, ClientResult};
use crate::runtime::Runtime;

/// Lists the user's upcoming events.
///
/// With `json`, the view is printed as-is (including reconnect and retry
/// states) and the command succeeds. Otherwise a failure view is returned as
/// an error.
pub async fn show(runtime: &Runtime, user: &str, json: bool) -> ClientResult<()> {
    let google = runtime.google_config()?;
    let service = runtime.calendar_service(&google)?;
    let view = CalendarView::from_result(service.upcoming_events(user).await);

    if json {
        let text = serde_json::to_string_pretty(&view)
            .map_err(|e| ClientError::Config(format!("failed to serialize events: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    match view {
        CalendarView::Events { events } => {
            let today = runtime.clock().now().date_naive();
            print!("{}", render(events, today));
            Ok(())
        }
        CalendarView::ReconnectRequired { message } => Err(ClientError::ReconnectRequired(format!(
            "{} Run `lifedash auth url`.",
            message
        ))),
        CalendarView::TemporarilyUnavailable { message } => Err(ClientError::Unavailable(message)),
    }
}

/// Text listing with a "Today" and an "Upcoming" section.
fn render(events: Vec<CalendarEvent>, today: NaiveDate) -> String {
    if events.is_empty() {
        return "No upcoming events.\n".to_string();
    }

    let (todays, later) = split_today(events, today);
    let mut out = String::new();
    for (title, section) in [("Today", todays), ("Upcoming", later)] {
        if section.is_empty() {
            continue;
        }
        out.push_str(title);
        out.push('\n');
        for event in &section {
            out.push_str(&format!("  {}  {}", when(&event.start), display_summary(event)));
            if let Some(ref location) = event.location {
                out.push_str(&format!(" ({})", location));
            }
            out.push('\n');
        }
    }
    out
}

fn display_summary(event: &CalendarEvent) -> &str {
    if event.summary.trim().is_empty() {
        "(no title)"
    } else {
        &event.summary
    }
}

fn when(time: &EventTime) -> String {
    match time {
        EventTime::DateTime(dt) => dt.with_timezone(&Local).format("%a %d %b %H:%M").to_string(),
        EventTime::AllDay(date) => format!("{}  all day", date.format("%a %d %b")),
    }
}
