//! The per-user Google token record and the updates applied to it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One user's stored Google credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleToken {
    pub user_id: String,

    /// Short-lived bearer credential.
    pub access_token: String,

    /// Long-lived credential used to mint new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Instant after which `access_token` must not be used.
    pub expiry_date: DateTime<Utc>,

    /// Time of the last write to this record.
    pub updated_at: DateTime<Utc>,
}

impl GoogleToken {
    /// The refresh token, if present and non-blank.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|rt| !rt.trim().is_empty())
    }

    /// True when `expiry_date <= now + guard`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, guard: Duration) -> bool {
        self.expiry_date <= now + guard
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    /// Time left before expiry; negative once expired.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expiry_date - now
    }
}

/// Freshness of a user's token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No record for the user.
    NoToken,
    /// Usable as stored.
    Valid,
    /// Inside the guard window or already past expiry.
    ExpiringOrExpired,
}

impl TokenState {
    pub fn of(token: Option<&GoogleToken>, now: DateTime<Utc>, guard: Duration) -> Self {
        match token {
            None => Self::NoToken,
            Some(t) if t.needs_refresh(now, guard) => Self::ExpiringOrExpired,
            Some(_) => Self::Valid,
        }
    }
}

/// Fields written by a token store upsert.
///
/// An access token is always written together with its expiry. The refresh
/// token is only written when one is explicitly present; otherwise the
/// stored value is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    access_token: String,
    expiry_date: DateTime<Utc>,
    refresh_token: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TokenUpdate {
    /// Result of a refresh exchange. Leaves the stored refresh token alone.
    pub fn refreshed(
        access_token: impl Into<String>,
        expiry_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expiry_date,
            refresh_token: None,
            updated_at: now,
        }
    }

    /// Result of an authorization-code exchange.
    ///
    /// A missing or blank `refresh_token` keeps whatever the store already
    /// holds for the user.
    pub fn authorized(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::refreshed(access_token, expiry_date, now).with_rotated_refresh_token(refresh_token)
    }

    /// Adds a refresh token the provider explicitly issued. Blank values are
    /// ignored.
    pub fn with_rotated_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token.filter(|rt| !rt.trim().is_empty());
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.expiry_date
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Merges this update into `existing`, or builds a new record.
    pub fn apply(self, user_id: &str, existing: Option<GoogleToken>) -> GoogleToken {
        match existing {
            Some(mut token) => {
                token.access_token = self.access_token;
                token.expiry_date = self.expiry_date;
                token.updated_at = self.updated_at;
                if let Some(rt) = self.refresh_token {
                    token.refresh_token = Some(rt);
                }
                token
            }
            None => GoogleToken {
                user_id: user_id.to_string(),
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expiry_date: self.expiry_date,
                updated_at: self.updated_at,
            },
        }
    }
}
