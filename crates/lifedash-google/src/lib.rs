//! Google OAuth token lifecycle and Calendar access.
//!
//! - [`TokenStore`] persists one [`GoogleToken`] per user
//! - [`TokenRefresher`] trades a refresh token for a new access token and
//!   writes it back
//! - [`TokenValidator`] hands out an access token that is safe to use now,
//!   refreshing it at most once per user at a time
//! - [`CalendarConnector`] runs the authorization-code connect flow
//! - [`CalendarService`] lists upcoming events on top of the validator
//! - [`HealthChecker`] reports connection status without touching tokens
//!
//! # Architecture
//!
//! ```text
//!   CalendarService ──► TokenValidator ──► TokenRefresher ──► TokenExchange
//!         │                   │                  │           (token endpoint)
//!         ▼                   └───────┬──────────┘
//!    CalendarApi                      ▼
//!  (events.list)                 TokenStore ◄── CalendarConnector
//!                                     ▲
//!                                HealthChecker
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lifedash_google::*;
//!
//! let exchange = Arc::new(GoogleOAuthClient::new(&config)?);
//! let refresher = TokenRefresher::new(exchange, store.clone(), clock.clone(), &logger)
//!     .with_config(&config);
//! let validator = TokenValidator::new(store, refresher, clock, &logger).with_config(&config);
//! let access_token = validator.get_valid_access_token("user-1").await?;
//! ```

pub mod calendar;
pub mod config;
pub mod connect;
pub mod error;
pub mod flight;
pub mod health;
pub mod oauth;
pub mod refresher;
pub mod store;
pub mod token;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use calendar::{
    CalendarApi, CalendarEvent, CalendarService, CalendarView, GoogleCalendarClient, split_today,
};
pub use config::{GoogleConfig, OAuthCredentials};
pub use connect::CalendarConnector;
pub use error::{CalendarError, StoreError, TokenError, TokenErrorKind};
pub use flight::{FlightGuard, SingleFlight};
pub use health::{
    ConnectionStatus, DatabaseHealth, DatabaseStatus, HealthChecker, HealthMetadata, HealthReport,
    HealthStatus, Services, TokenHealth, token_health,
};
pub use oauth::{GoogleOAuthClient, TokenExchange, TokenGrant, parse_token_response};
pub use refresher::{RefreshedToken, TokenRefresher};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{GoogleToken, TokenState, TokenUpdate};
pub use validator::TokenValidator;
