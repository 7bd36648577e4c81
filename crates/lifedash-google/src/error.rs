//! Error types for the token lifecycle and calendar access.
//!
//! Every raw failure (HTTP status, transport error, store I/O) is classified
//! exactly once, where it is received, into one of these types. Callers
//! match on variants; nothing downstream inspects message text.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The category of a [`TokenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    /// No token record, or no usable refresh token.
    NotConnected,
    /// The provider refused the refresh exchange.
    ProviderRejected,
    /// Network failure or timeout talking to the provider.
    ProviderUnreachable,
    /// The token store could not be read or written.
    PersistenceFailed,
}

impl TokenErrorKind {
    /// Returns true if retrying the whole validation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnreachable | Self::PersistenceFailed)
    }

    /// Returns true if the user has to authorize the calendar again.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ProviderRejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::ProviderRejected => "provider_rejected",
            Self::ProviderUnreachable => "provider_unreachable",
            Self::PersistenceFailed => "persistence_failed",
        }
    }
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to produce a usable access token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("google calendar not connected: {reason}")]
    NotConnected { reason: String },

    #[error("token refresh rejected by provider: {detail}")]
    ProviderRejected { detail: String },

    #[error("token provider unreachable: {detail}")]
    ProviderUnreachable { detail: String },

    #[error("failed to persist token: {detail}")]
    PersistenceFailed { detail: String },
}

impl TokenError {
    pub fn not_connected(reason: impl Into<String>) -> Self {
        Self::NotConnected {
            reason: reason.into(),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self::ProviderRejected {
            detail: detail.into(),
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::ProviderUnreachable {
            detail: detail.into(),
        }
    }

    pub fn persistence(detail: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> TokenErrorKind {
        match self {
            Self::NotConnected { .. } => TokenErrorKind::NotConnected,
            Self::ProviderRejected { .. } => TokenErrorKind::ProviderRejected,
            Self::ProviderUnreachable { .. } => TokenErrorKind::ProviderUnreachable,
            Self::PersistenceFailed { .. } => TokenErrorKind::PersistenceFailed,
        }
    }

    /// The diagnostic text carried by the variant.
    pub fn detail(&self) -> &str {
        match self {
            Self::NotConnected { reason } => reason,
            Self::ProviderRejected { detail }
            | Self::ProviderUnreachable { detail }
            | Self::PersistenceFailed { detail } => detail,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn requires_reconnect(&self) -> bool {
        self.kind().requires_reconnect()
    }
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        Self::persistence(err.to_string())
    }
}

/// Failure of a token store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store data is invalid: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("token store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// Failure to list calendar events.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The calendar API answered 401 for the presented access token.
    #[error("calendar API rejected the access token")]
    Unauthorized,

    #[error("calendar request failed: {0}")]
    Network(String),

    #[error("calendar API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid calendar response: {0}")]
    InvalidResponse(String),
}

impl CalendarError {
    /// Returns true if the user must reconnect the calendar to recover.
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Token(e) => e.requires_reconnect(),
            Self::Unauthorized => true,
            Self::Network(_) | Self::Api { .. } | Self::InvalidResponse(_) => false,
        }
    }

    /// Short code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Token(e) => e.kind().as_str(),
            Self::Unauthorized => "unauthorized",
            Self::Network(_) => "network",
            Self::Api { .. } => "api_error",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        if self.requires_reconnect() {
            "Google Calendar is not connected. Please reconnect your calendar."
        } else {
            "Calendar is temporarily unavailable. Please try again."
        }
    }
}
