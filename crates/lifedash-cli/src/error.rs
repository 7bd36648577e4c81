//! CLI error types.

use std::fmt;

use lifedash_google::{CalendarError, TokenError};

/// Result type for CLI operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to the user by a command.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Token lifecycle failure.
    Token(TokenError),
    /// Calendar listing failure.
    Calendar(CalendarError),
    /// HTTP client could not be built.
    Http(String),
    /// The OAuth callback did not match the request.
    AuthMismatch(String),
    /// The calendar must be connected again.
    ReconnectRequired(String),
    /// A dependency is down (health check or calendar).
    Unavailable(String),
    /// Action failed (open browser).
    Action(String),
}

impl ClientError {
    /// True when re-running `lifedash auth` is the fix.
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Token(err) => err.requires_reconnect(),
            Self::Calendar(err) => err.requires_reconnect(),
            Self::AuthMismatch(_) | Self::ReconnectRequired(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Token(err) => write!(f, "token error ({}): {}", err.kind(), err),
            Self::Calendar(err) => write!(f, "calendar error ({}): {}", err.code(), err),
            Self::Http(msg) => write!(f, "HTTP client error: {}", msg),
            Self::AuthMismatch(msg) => write!(f, "authorization rejected: {}", msg),
            Self::ReconnectRequired(msg) => write!(f, "reconnect required: {}", msg),
            Self::Unavailable(msg) => write!(f, "unavailable: {}", msg),
            Self::Action(msg) => write!(f, "action failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Token(err) => Some(err),
            Self::Calendar(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TokenError> for ClientError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}

impl From<CalendarError> for ClientError {
    fn from(err: CalendarError) -> Self {
        Self::Calendar(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_hint_follows_error_kind() {
        assert!(ClientError::from(TokenError::not_connected("no record")).requires_reconnect());
        assert!(ClientError::from(CalendarError::Unauthorized).requires_reconnect());
        assert!(!ClientError::from(TokenError::unreachable("timeout")).requires_reconnect());
        assert!(!ClientError::Config("bad".to_string()).requires_reconnect());
    }

    #[test]
    fn display_includes_kind_code() {
        let err = ClientError::from(TokenError::rejected("invalid_grant"));
        let text = err.to_string();
        assert!(text.starts_with("token error (provider_rejected)"));
        assert!(text.contains("invalid_grant"));
    }
}
