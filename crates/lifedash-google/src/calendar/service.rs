use std::sync::Arc;

use lifedash_core::{Clock, LogContext, Logger, TimeWindow};
use serde::Serialize;

use super::{CalendarApi, CalendarEvent};
use crate::config::GoogleConfig;
use crate::error::CalendarError;
use crate::validator::TokenValidator;

/// Lists a user's upcoming events with a validated access token.
pub struct CalendarService {
    validator: Arc<TokenValidator>,
    api: Arc<dyn CalendarApi>,
    clock: Arc<dyn Clock>,
    logger: Logger,
    window_days: u32,
}

impl CalendarService {
    pub fn new(
        validator: Arc<TokenValidator>,
        api: Arc<dyn CalendarApi>,
        clock: Arc<dyn Clock>,
        logger: &Logger,
    ) -> Self {
        Self {
            validator,
            api,
            clock,
            logger: logger.child("google-calendar"),
            window_days: GoogleConfig::DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_config(self, config: &GoogleConfig) -> Self {
        self.with_window_days(config.window_days)
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Events from now through the listing window.
    ///
    /// If the API rejects a token the validator considered valid, one forced
    /// refresh and one retry are made. A second rejection is returned as
    /// [`CalendarError::Unauthorized`].
    pub async fn upcoming_events(&self, user_id: &str) -> Result<Vec<CalendarEvent>, CalendarError> {
        let result = self.list(user_id).await;
        if let Err(err) = &result {
            self.logger
                .log_error(
                    err,
                    LogContext::new()
                        .with_user(user_id)
                        .with_code(err.code())
                        .with_field("requires_reconnect", err.requires_reconnect()),
                )
                .await;
        }
        result
    }

    async fn list(&self, user_id: &str) -> Result<Vec<CalendarEvent>, CalendarError> {
        let window = TimeWindow::upcoming_days(self.clock.now(), self.window_days);
        let access_token = self.validator.get_valid_access_token(user_id).await?;

        match self.api.list_events(&access_token, &window).await {
            Err(CalendarError::Unauthorized) => {
                self.logger
                    .warn(
                        "calendar rejected access token, forcing refresh",
                        LogContext::new().with_user(user_id),
                    )
                    .await;
                let access_token = self
                    .validator
                    .refresh_now(user_id, &access_token)
                    .await?;
                self.api.list_events(&access_token, &window).await
            }
            other => other,
        }
    }
}

/// What the dashboard shows for the calendar panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalendarView {
    Events { events: Vec<CalendarEvent> },
    /// Show a connect action.
    ReconnectRequired { message: String },
    /// Show a retry action.
    TemporarilyUnavailable { message: String },
}

impl CalendarView {
    pub fn from_result(result: Result<Vec<CalendarEvent>, CalendarError>) -> Self {
        match result {
            Ok(events) => Self::Events { events },
            Err(err) if err.requires_reconnect() => Self::ReconnectRequired {
                message: err.user_message().to_string(),
            },
            Err(err) => Self::TemporarilyUnavailable {
                message: err.user_message().to_string(),
            },
        }
    }
}
