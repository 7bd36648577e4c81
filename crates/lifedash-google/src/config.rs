//! Google OAuth and Calendar configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// OAuth 2.0 client credentials from Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of the credentials JSON downloaded from Google Cloud Console.
///
/// Both the nested (`installed` / `web`) and the flat form are accepted.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses credentials from either `{"web": {...}}`, `{"installed": {...}}`
    /// or a flat `{"client_id": ..., "client_secret": ...}` object.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.web.or(file.installed) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err("credentials file must contain a 'web'/'installed' section or root-level 'client_id'/'client_secret'".to_string())
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration shared by the token refresher, connect flow and calendar
/// client. Built once at startup and held for the process lifetime.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Redirect URI registered for the authorization-code flow.
    pub redirect_uri: String,

    /// Token endpoint used for code exchange and refresh.
    pub token_url: String,

    /// Consent page the user is sent to.
    pub auth_url: String,

    /// Base URL of the Calendar v3 API.
    pub calendar_api_base: String,

    pub scopes: Vec<String>,

    /// Timeout for each HTTP request to Google.
    pub timeout: Duration,

    /// Timeout for each token store read or write.
    pub store_timeout: Duration,

    /// Tokens expiring within this window are refreshed before use.
    pub guard_window: chrono::Duration,

    pub calendar_id: String,

    /// Days ahead of "now" covered by an event listing.
    pub window_days: u32,

    pub max_results: u32,

    pub user_agent: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_GUARD_WINDOW_MINUTES: i64 = 5;
    pub const DEFAULT_WINDOW_DAYS: u32 = 7;
    pub const DEFAULT_MAX_RESULTS: u32 = 50;

    pub const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const CALENDAR_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://localhost:3000/api/auth/google/callback";

    pub const DEFAULT_SCOPES: [&'static str; 3] = [
        "https://www.googleapis.com/auth/calendar.readonly",
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
    ];

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            redirect_uri: Self::DEFAULT_REDIRECT_URI.to_string(),
            token_url: Self::TOKEN_URL.to_string(),
            auth_url: Self::AUTH_URL.to_string(),
            calendar_api_base: Self::CALENDAR_API_BASE.to_string(),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(Self::DEFAULT_STORE_TIMEOUT_SECS),
            guard_window: chrono::Duration::minutes(Self::DEFAULT_GUARD_WINDOW_MINUTES),
            calendar_id: "primary".to_string(),
            window_days: Self::DEFAULT_WINDOW_DAYS,
            max_results: Self::DEFAULT_MAX_RESULTS,
            user_agent: format!("lifedash/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn with_calendar_api_base(mut self, url: impl Into<String>) -> Self {
        self.calendar_api_base = url.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_guard_window(mut self, window: chrono::Duration) -> Self {
        self.guard_window = window;
        self
    }

    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_max_results(mut self, max: u32) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("token_url", &self.token_url),
            ("auth_url", &self.auth_url),
            ("calendar_api_base", &self.calendar_api_base),
        ] {
            url::Url::parse(value).map_err(|e| format!("invalid {}: {}", name, e))?;
        }

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        if self.guard_window < chrono::Duration::zero() {
            return Err("guard window must not be negative".to_string());
        }
        if self.calendar_id.is_empty() {
            return Err("calendar_id is required".to_string());
        }
        if self.window_days == 0 {
            return Err("listing window must cover at least one day".to_string());
        }
        if self.max_results == 0 {
            return Err("max_results must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("x.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.window_days, 7);
        assert_eq!(config.max_results, 50);
        assert_eq!(config.guard_window, chrono::Duration::minutes(5));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.store_timeout, Duration::from_secs(10));
        assert_eq!(config.scopes.len(), 3);
        assert!(config.scopes[0].ends_with("calendar.readonly"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_methods() {
        let config = GoogleConfig::new(test_credentials())
            .with_redirect_uri("https://dash.example.com/api/auth/google/callback")
            .with_token_url("http://127.0.0.1:9000/token")
            .with_calendar_id("work@example.com")
            .with_window_days(14)
            .with_max_results(10)
            .with_guard_window(chrono::Duration::minutes(2))
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.token_url, "http://127.0.0.1:9000/token");
        assert_eq!(config.calendar_id, "work@example.com");
        assert_eq!(config.window_days, 14);
        assert_eq!(config.max_results, 10);
        assert_eq!(config.guard_window, chrono::Duration::minutes(2));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_failures() {
        let base = || GoogleConfig::new(test_credentials());
        assert!(base().with_scopes(vec![]).validate().is_err());
        assert!(base().with_token_url("not a url").validate().is_err());
        assert!(base().with_max_results(0).validate().is_err());
        assert!(base().with_window_days(0).validate().is_err());
        assert!(
            base()
                .with_guard_window(chrono::Duration::minutes(-1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret",
                "project_id": "life-dashboard"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "web-secret");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{"client_id": "flat.apps.googleusercontent.com", "client_secret": "s"}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_errors() {
        assert!(
            OAuthCredentials::from_json(r#"{ "other": {} }"#)
                .unwrap_err()
                .contains("client_id")
        );
        assert!(
            OAuthCredentials::from_json("not json")
                .unwrap_err()
                .contains("parse")
        );
    }

    #[test]
    fn credentials_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "file.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();

        let creds = OAuthCredentials::from_file(&path).unwrap();
        assert_eq!(creds.client_id, "file.apps.googleusercontent.com");
        assert!(OAuthCredentials::from_file(dir.path().join("missing.json")).is_err());
    }
}
