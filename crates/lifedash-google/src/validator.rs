//! Token Validator: returns an access token that is safe to use now.
//!
//! Freshness is decided at call time from the stored expiry:
//!
//! - no record: [`TokenError::NotConnected`]
//! - `now + guard_window < expiry`: stored token, no further I/O
//! - otherwise: one refresh through [`TokenRefresher`]
//!
//! Refreshes for the same user are single-flight: the first caller refreshes
//! while later callers wait, then re-read the store and reuse its result.

use std::sync::Arc;
use std::time::Duration;

use lifedash_core::{Clock, LogContext, Logger};

use crate::config::GoogleConfig;
use crate::error::{StoreError, TokenError};
use crate::flight::SingleFlight;
use crate::refresher::TokenRefresher;
use crate::store::TokenStore;
use crate::token::{GoogleToken, TokenState};

pub struct TokenValidator {
    store: Arc<dyn TokenStore>,
    refresher: TokenRefresher,
    clock: Arc<dyn Clock>,
    logger: Logger,
    guard_window: chrono::Duration,
    store_timeout: Duration,
    flights: SingleFlight,
}

impl TokenValidator {
    pub fn new(
        store: Arc<dyn TokenStore>,
        refresher: TokenRefresher,
        clock: Arc<dyn Clock>,
        logger: &Logger,
    ) -> Self {
        Self {
            store,
            refresher,
            clock,
            logger: logger.child("google-token"),
            guard_window: chrono::Duration::minutes(GoogleConfig::DEFAULT_GUARD_WINDOW_MINUTES),
            store_timeout: Duration::from_secs(GoogleConfig::DEFAULT_STORE_TIMEOUT_SECS),
            flights: SingleFlight::new(),
        }
    }

    /// Takes the guard window and store timeout from `config`.
    pub fn with_config(self, config: &GoogleConfig) -> Self {
        self.with_guard_window(config.guard_window)
            .with_store_timeout(config.store_timeout)
    }

    pub fn with_guard_window(mut self, window: chrono::Duration) -> Self {
        self.guard_window = window;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn guard_window(&self) -> chrono::Duration {
        self.guard_window
    }

    /// Returns a usable access token for `user_id`, refreshing it first if
    /// it expires within the guard window.
    pub async fn get_valid_access_token(&self, user_id: &str) -> Result<String, TokenError> {
        let Some(token) = self.read(user_id).await? else {
            return Err(self.not_connected(user_id, "no Google token stored").await);
        };

        if !token.needs_refresh(self.clock.now(), self.guard_window) {
            return Ok(token.access_token);
        }
        self.refresh_guarded(user_id, None).await
    }

    /// Forces a refresh after the calendar API rejected `rejected_access_token`.
    ///
    /// If another caller already replaced that token with one that is still
    /// valid, the replacement is returned without a second refresh.
    pub async fn refresh_now(
        &self,
        user_id: &str,
        rejected_access_token: &str,
    ) -> Result<String, TokenError> {
        self.refresh_guarded(user_id, Some(rejected_access_token))
            .await
    }

    async fn refresh_guarded(
        &self,
        user_id: &str,
        rejected: Option<&str>,
    ) -> Result<String, TokenError> {
        let _flight = self.flights.acquire(user_id).await;

        // Re-read under the guard: a caller ahead of us may have refreshed.
        let Some(token) = self.read(user_id).await? else {
            return Err(self.not_connected(user_id, "no Google token stored").await);
        };

        let state = TokenState::of(Some(&token), self.clock.now(), self.guard_window);
        let already_replaced = rejected.is_none_or(|r| r != token.access_token);
        if state == TokenState::Valid && already_replaced {
            tracing::debug!(user_id, "token already refreshed by a concurrent caller");
            return Ok(token.access_token);
        }

        let Some(refresh_token) = token.usable_refresh_token() else {
            return Err(self
                .not_connected(user_id, "no refresh token stored; authorize again")
                .await);
        };

        self.logger
            .debug(
                "access token expiring or rejected, refreshing",
                LogContext::new()
                    .with_user(user_id)
                    .with_field("expiry_date", token.expiry_date.to_rfc3339()),
            )
            .await;

        let refreshed = self.refresher.refresh(user_id, refresh_token).await?;
        Ok(refreshed.access_token)
    }

    async fn read(&self, user_id: &str) -> Result<Option<GoogleToken>, TokenError> {
        let result = match tokio::time::timeout(self.store_timeout, self.store.get(user_id)).await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        };

        match result {
            Ok(token) => Ok(token),
            Err(store_err) => {
                let err = TokenError::from(store_err);
                self.logger
                    .error(
                        &format!("failed to read Google token: {}", err.detail()),
                        LogContext::new()
                            .with_user(user_id)
                            .with_code(err.kind().as_str()),
                    )
                    .await;
                Err(err)
            }
        }
    }

    async fn not_connected(&self, user_id: &str, reason: &str) -> TokenError {
        let err = TokenError::not_connected(reason);
        self.logger
            .warn(
                reason,
                LogContext::new()
                    .with_user(user_id)
                    .with_code(err.kind().as_str()),
            )
            .await;
        err
    }
}
