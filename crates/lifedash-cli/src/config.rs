//! CLI configuration.
//!
//! All settings live in `~/.config/lifedash/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "env::GOOGLE_CLIENT_ID"
//! client_secret = "pass::google/lifedash"
//! calendar_id = "primary"
//!
//! [logging]
//! level = "info"
//! persist = true
//! ```
//!
//! `client_id` and `client_secret` accept secret references (see
//! [`crate::secret`]).

use std::path::{Path, PathBuf};

use lifedash_core::{LogLevel, TracingOutputFormat};
use lifedash_google::{GoogleConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};

use crate::secret::{self, SecretRef};

// ---------------------------------------------------------------------------
// AppConfig (config.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub google: GoogleSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads the default file, or defaults if it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lifedash")
    }

    /// Where tokens and persisted logs live unless configured otherwise.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lifedash")
    }

    /// A copy safe to print: literal secrets are masked.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_deref().map(|s| SecretRef::parse(s).redacted());
        Self {
            google: GoogleSettings {
                client_secret: mask(&self.google.client_secret),
                ..self.google.clone()
            },
            logging: self.logging.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// [google]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::`).
    pub client_id: Option<String>,
    /// OAuth client secret (supports `pass::` and `env::`).
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Token file; defaults to `<data dir>/lifedash/tokens.json`.
    pub token_path: Option<PathBuf>,
    pub calendar_id: String,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            token_path: None,
            calendar_id: "primary".to_string(),
        }
    }
}

impl GoogleSettings {
    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Resolves `client_id` and `client_secret`, expanding secret references.
    pub fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"",
                AppConfig::default_path().display()
            )
        })?;
        let raw_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| "client_secret is missing from [google] in config.toml".to_string())?;

        let client_id = secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let client_secret = secret::resolve(raw_secret)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(client_id, client_secret))
    }

    /// Builds and validates the library configuration for `credentials`.
    pub fn to_google_config(&self, credentials: OAuthCredentials) -> Result<GoogleConfig, String> {
        credentials.validate().map_err(|e| e.to_string())?;

        let mut config = GoogleConfig::new(credentials).with_calendar_id(&self.calendar_id);
        if let Some(ref uri) = self.redirect_uri {
            config = config.with_redirect_uri(uri);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| AppConfig::default_data_dir().join("tokens.json"))
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level: error, warn, info, debug.
    pub level: String,
    /// Append warn/error entries to `log_path`.
    pub persist: bool,
    /// Defaults to `<data dir>/lifedash/logs.jsonl`.
    pub log_path: Option<PathBuf>,
    pub environment: String,
    /// Console format: pretty, compact, json.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            persist: true,
            log_path: None,
            environment: "development".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn min_level(&self) -> Result<LogLevel, String> {
        self.level.parse().map_err(|e| format!("[logging] level: {}", e))
    }

    pub fn output_format(&self) -> Result<TracingOutputFormat, String> {
        self.format
            .parse()
            .map_err(|e| format!("[logging] format: {}", e))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| AppConfig::default_data_dir().join("logs.jsonl"))
    }
}
