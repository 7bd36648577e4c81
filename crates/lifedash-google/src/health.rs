//! Read-only health report for the token store and a user's calendar link.
//!
//! Nothing here refreshes a token: the calendar status is computed from the
//! stored expiry alone.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lifedash_core::Clock;
use serde::Serialize;
use tracing::warn;

use crate::config::GoogleConfig;
use crate::error::StoreError;
use crate::store::TokenStore;
use crate::token::GoogleToken;

/// Minutes of remaining validity below which a token reports `expiring`.
pub const EXPIRING_THRESHOLD_MINUTES: i64 = 5;

/// Key read when no user is given, to probe the store itself.
const PROBE_USER_ID: &str = "__health_probe__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    fn degrade(&mut self) {
        if *self == Self::Healthy {
            *self = Self::Degraded;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Up,
    Down,
}

/// Calendar connection state as seen from the stored token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Up,
    Expiring,
    Expired,
    Disconnected,
    #[serde(rename = "n/a")]
    NotApplicable,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Expiring => "expiring",
            Self::Expired => "expired",
            Self::Disconnected => "disconnected",
            Self::NotApplicable => "n/a",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub status: DatabaseStatus,
    /// Store round-trip in milliseconds.
    pub latency: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHealth {
    pub status: ConnectionStatus,
    pub message: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<i64>,
}

impl TokenHealth {
    fn new(status: ConnectionStatus, message: impl Into<String>, connected: bool) -> Self {
        Self {
            status,
            message: message.into(),
            connected,
            expires_in_minutes: None,
        }
    }

    fn no_user() -> Self {
        Self::new(ConnectionStatus::NotApplicable, "No user authenticated", false)
    }

    fn unreadable(err: &StoreError) -> Self {
        Self::new(ConnectionStatus::Error, err.to_string(), false)
    }
}

/// Projects a stored token onto a connection status at `now`.
pub fn token_health(token: Option<&GoogleToken>, now: DateTime<Utc>) -> TokenHealth {
    let Some(token) = token else {
        return TokenHealth::new(ConnectionStatus::Disconnected, "Calendar not connected", false);
    };

    if token.is_expired(now) {
        return TokenHealth::new(
            ConnectionStatus::Expired,
            "Token expired, needs refresh",
            true,
        );
    }

    // Not expired, so the remaining time is non-negative and truncation floors.
    let minutes = token.time_until_expiry(now).num_minutes();
    if minutes < EXPIRING_THRESHOLD_MINUTES {
        TokenHealth {
            expires_in_minutes: Some(minutes),
            ..TokenHealth::new(
                ConnectionStatus::Expiring,
                format!("Token expires in {} minutes", minutes),
                true,
            )
        }
    } else {
        TokenHealth {
            expires_in_minutes: Some(minutes),
            ..TokenHealth::new(ConnectionStatus::Up, "Connected", true)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Services {
    pub database: DatabaseHealth,
    pub google_calendar: TokenHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthMetadata {
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    /// Time spent building the report, in milliseconds.
    pub response_time: u64,
    pub services: Services,
    pub metadata: HealthMetadata,
}

impl HealthReport {
    /// HTTP status a health endpoint should answer with.
    pub fn http_status(&self) -> u16 {
        match self.status {
            HealthStatus::Healthy | HealthStatus::Degraded => 200,
            HealthStatus::Down => 503,
        }
    }
}

pub struct HealthChecker {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    metadata: HealthMetadata,
}

impl HealthChecker {
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            store_timeout: Duration::from_secs(GoogleConfig::DEFAULT_STORE_TIMEOUT_SECS),
            metadata: HealthMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                environment: "unknown".to_string(),
            },
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = version.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.metadata.environment = environment.into();
        self
    }

    /// Builds a report. With a `user_id`, that user's token is read and
    /// projected; the same read serves as the store probe.
    pub async fn check(&self, user_id: Option<&str>) -> HealthReport {
        let started = Instant::now();
        let mut status = HealthStatus::Healthy;

        let probe_started = Instant::now();
        let read = self.read(user_id.unwrap_or(PROBE_USER_ID)).await;
        let latency = elapsed_ms(probe_started);

        let (database, google_calendar) = match read {
            Ok(token) => {
                let database = DatabaseHealth {
                    status: DatabaseStatus::Up,
                    latency,
                    message: "Connected".to_string(),
                };
                let calendar = match user_id {
                    Some(_) => token_health(token.as_ref(), self.clock.now()),
                    None => TokenHealth::no_user(),
                };
                (database, calendar)
            }
            Err(err) => {
                warn!("token store health probe failed: {}", err);
                status = HealthStatus::Down;
                let database = DatabaseHealth {
                    status: DatabaseStatus::Down,
                    latency,
                    message: err.to_string(),
                };
                let calendar = match user_id {
                    Some(_) => TokenHealth::unreadable(&err),
                    None => TokenHealth::no_user(),
                };
                (database, calendar)
            }
        };

        if matches!(
            google_calendar.status,
            ConnectionStatus::Expired | ConnectionStatus::Error
        ) {
            status.degrade();
        }

        HealthReport {
            status,
            timestamp: self.clock.now(),
            response_time: elapsed_ms(started),
            services: Services {
                database,
                google_calendar,
            },
            metadata: self.metadata.clone(),
        }
    }

    async fn read(&self, user_id: &str) -> Result<Option<GoogleToken>, StoreError> {
        match tokio::time::timeout(self.store_timeout, self.store.get(user_id)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
