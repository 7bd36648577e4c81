//! Wiring from configuration to library services.

use std::sync::Arc;

use lifedash_core::{
    Clock, JsonLinesSink, LogSink, Logger, LoggerConfig, SystemClock, TracingSink,
};
use lifedash_google::{
    CalendarConnector, CalendarService, FileTokenStore, GoogleCalendarClient, GoogleConfig,
    GoogleOAuthClient, HealthChecker, OAuthCredentials, TokenRefresher, TokenStore,
    TokenValidator,
};

use crate::cli::CredentialArgs;
use crate::config::{AppConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Shared handles for one CLI invocation.
pub struct Runtime {
    config: AppConfig,
    credentials: CredentialArgs,
    logger: Logger,
    store: Arc<FileTokenStore>,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    /// Builds the logger and token store. Credentials are resolved lazily,
    /// so commands that only read the store work without them.
    pub fn new(config: AppConfig, credentials: CredentialArgs) -> ClientResult<Self> {
        let logger = build_logger(&config)?;
        let store = Arc::new(FileTokenStore::new(config.google.token_path()));
        Ok(Self {
            config,
            credentials,
            logger,
            store,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        self.store.clone()
    }

    pub fn google_config(&self) -> ClientResult<GoogleConfig> {
        let credentials = resolve_google_credentials(&self.credentials, &self.config.google)?;
        self.config
            .google
            .to_google_config(credentials)
            .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))
    }

    pub fn validator(&self, google: &GoogleConfig) -> ClientResult<TokenValidator> {
        let exchange = Arc::new(
            GoogleOAuthClient::new(google).map_err(|e| ClientError::Http(e.to_string()))?,
        );
        let refresher = TokenRefresher::new(exchange, self.store(), self.clock.clone(), &self.logger)
            .with_config(google);
        Ok(
            TokenValidator::new(self.store(), refresher, self.clock.clone(), &self.logger)
                .with_config(google),
        )
    }

    pub fn connector(&self, google: &GoogleConfig) -> ClientResult<CalendarConnector> {
        let exchange = Arc::new(
            GoogleOAuthClient::new(google).map_err(|e| ClientError::Http(e.to_string()))?,
        );
        Ok(CalendarConnector::new(
            google.clone(),
            exchange,
            self.store(),
            self.clock.clone(),
            &self.logger,
        ))
    }

    pub fn calendar_service(&self, google: &GoogleConfig) -> ClientResult<CalendarService> {
        let validator = Arc::new(self.validator(google)?);
        let api = Arc::new(
            GoogleCalendarClient::new(google).map_err(|e| ClientError::Http(e.to_string()))?,
        );
        Ok(
            CalendarService::new(validator, api, self.clock.clone(), &self.logger)
                .with_config(google),
        )
    }

    pub fn health_checker(&self) -> HealthChecker {
        HealthChecker::new(self.store(), self.clock.clone())
            .with_environment(&self.config.logging.environment)
    }
}

fn build_logger(config: &AppConfig) -> ClientResult<Logger> {
    let logging = &config.logging;
    let logger_config = LoggerConfig::default()
        .with_min_level(logging.min_level().map_err(ClientError::Config)?)
        .with_persist(logging.persist)
        .with_environment(&logging.environment);

    let persistent = logging
        .persist
        .then(|| Arc::new(JsonLinesSink::new(logging.log_path())) as Arc<dyn LogSink>);

    Ok(Logger::new(logger_config, Arc::new(TracingSink), persistent))
}

/// Resolves Google credentials.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
/// 3. `[google]` in config.toml, with secret references expanded
pub fn resolve_google_credentials(
    cli: &CredentialArgs,
    settings: &GoogleSettings,
) -> ClientResult<OAuthCredentials> {
    if let (Some(id), Some(secret)) = (&cli.client_id, &cli.client_secret) {
        return Ok(OAuthCredentials::new(id, secret));
    }

    if let Some(ref path) = cli.credentials_file {
        return OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        });
    }

    if cli.client_id.is_some() || cli.client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    if settings.has_credentials() {
        return settings.resolve_credentials().map_err(|e| {
            ClientError::Config(format!(
                "failed to resolve Google credentials from config: {}",
                e
            ))
        });
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        AppConfig::default_path().display()
    )))
}
