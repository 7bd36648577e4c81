//! Authorization-code connect flow.
//!
//! 1. Send the user to [`CalendarConnector::authorization_url`] with a random
//!    `state` from [`CalendarConnector::new_state`].
//! 2. Google redirects back with `code` and `state`.
//! 3. [`CalendarConnector::complete`] exchanges the code and stores the
//!    full token record for the user.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use constant_time_eq::constant_time_eq;
use lifedash_core::{Clock, LogContext, Logger};
use rand::Rng as _;
use url::Url;

use crate::config::GoogleConfig;
use crate::error::{StoreError, TokenError};
use crate::oauth::TokenExchange;
use crate::store::TokenStore;
use crate::token::{GoogleToken, TokenUpdate};

/// Random bytes in a CSRF state value, before encoding.
const STATE_LENGTH: usize = 24;

pub struct CalendarConnector {
    config: GoogleConfig,
    exchange: Arc<dyn TokenExchange>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    logger: Logger,
}

impl CalendarConnector {
    pub fn new(
        config: GoogleConfig,
        exchange: Arc<dyn TokenExchange>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        logger: &Logger,
    ) -> Self {
        Self {
            config,
            exchange,
            store,
            clock,
            logger: logger.child("google-connect"),
        }
    }

    /// A fresh URL-safe CSRF state value.
    pub fn new_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..STATE_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Compares the state sent with the one received, in constant time.
    pub fn state_matches(expected: &str, received: &str) -> bool {
        constant_time_eq(expected.as_bytes(), received.as_bytes())
    }

    /// The consent page URL requesting offline access.
    pub fn authorization_url(&self, state: &str) -> Result<Url, url::ParseError> {
        let scope = self.config.scopes.join(" ");
        Url::parse_with_params(
            &self.config.auth_url,
            [
                ("client_id", self.config.credentials.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
    }

    /// Exchanges `code` and upserts the user's full token record.
    ///
    /// If Google issues no refresh token (it only does so on consent), any
    /// refresh token already stored is kept.
    pub async fn complete(&self, user_id: &str, code: &str) -> Result<GoogleToken, TokenError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(TokenError::not_connected("authorization code missing"));
        }

        let grant = match tokio::time::timeout(self.config.timeout, self.exchange.exchange_code(code))
            .await
        {
            Ok(Ok(grant)) => grant,
            Ok(Err(err)) => return Err(self.exchange_failed(user_id, err).await),
            Err(_) => {
                let err = TokenError::unreachable(format!(
                    "code exchange timed out after {:?}",
                    self.config.timeout
                ));
                return Err(self.exchange_failed(user_id, err).await);
            }
        };

        if grant.refresh_token.is_none() {
            self.logger
                .warn(
                    "authorization granted without a refresh token",
                    LogContext::new().with_user(user_id),
                )
                .await;
        }

        let now = self.clock.now();
        let expiry_date = match grant.expiry_from(now) {
            Ok(expiry) => expiry,
            Err(err) => return Err(self.exchange_failed(user_id, err).await),
        };
        let update = TokenUpdate::authorized(
            grant.access_token.clone(),
            grant.refresh_token.clone(),
            expiry_date,
            now,
        );

        let stored = self
            .upsert(user_id, update, self.config.store_timeout)
            .await
            .map_err(|e| TokenError::persistence(e.to_string()))?;

        self.logger
            .info(
                "google calendar connected",
                LogContext::new()
                    .with_user(user_id)
                    .with_field("scope", grant.scope.unwrap_or_default()),
            )
            .await;

        Ok(stored)
    }

    async fn exchange_failed(&self, user_id: &str, err: TokenError) -> TokenError {
        self.logger
            .error(
                &format!("authorization code exchange failed: {}", err),
                LogContext::new()
                    .with_user(user_id)
                    .with_code(err.kind().as_str()),
            )
            .await;
        err
    }

    async fn upsert(
        &self,
        user_id: &str,
        update: TokenUpdate,
        timeout: Duration,
    ) -> Result<GoogleToken, StoreError> {
        match tokio::time::timeout(timeout, self.store.upsert(user_id, update)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(timeout)),
        }
    }
}
