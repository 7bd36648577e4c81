//! Token Refresher: one refresh exchange, then one store write.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lifedash_core::{Clock, LogContext, Logger};

use crate::config::GoogleConfig;
use crate::error::{StoreError, TokenError};
use crate::oauth::TokenExchange;
use crate::store::TokenStore;
use crate::token::TokenUpdate;

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expiry_date: DateTime<Utc>,
}

/// Exchanges a refresh token for a new access token and persists it.
///
/// The provider call is attempted once. The stored refresh token is only
/// replaced when the provider explicitly issues a new one.
pub struct TokenRefresher {
    exchange: Arc<dyn TokenExchange>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    logger: Logger,
    provider_timeout: Duration,
    store_timeout: Duration,
}

impl TokenRefresher {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        logger: &Logger,
    ) -> Self {
        Self {
            exchange,
            store,
            clock,
            logger: logger.child("google-token"),
            provider_timeout: Duration::from_secs(GoogleConfig::DEFAULT_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(GoogleConfig::DEFAULT_STORE_TIMEOUT_SECS),
        }
    }

    /// Takes both timeouts from `config`.
    pub fn with_config(self, config: &GoogleConfig) -> Self {
        self.with_provider_timeout(config.timeout)
            .with_store_timeout(config.store_timeout)
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Refreshes `user_id`'s access token using `refresh_token`.
    ///
    /// On provider failure the store is not touched. A failed store write
    /// after a successful exchange is reported as
    /// [`TokenError::PersistenceFailed`] and the new token is discarded.
    pub async fn refresh(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, TokenError> {
        let ctx = || LogContext::new().with_user(user_id);

        let grant =
            match tokio::time::timeout(self.provider_timeout, self.exchange.refresh(refresh_token))
                .await
            {
                Ok(Ok(grant)) => grant,
                Ok(Err(err)) => return Err(self.refresh_failed(user_id, err).await),
                Err(_) => {
                    let err = TokenError::unreachable(format!(
                        "token request timed out after {:?}",
                        self.provider_timeout
                    ));
                    return Err(self.refresh_failed(user_id, err).await);
                }
            };

        let now = self.clock.now();
        let expiry_date = match grant.expiry_from(now) {
            Ok(expiry) => expiry,
            Err(err) => return Err(self.refresh_failed(user_id, err).await),
        };
        let rotated = grant.refresh_token.is_some();
        let update = TokenUpdate::refreshed(grant.access_token.clone(), expiry_date, now)
            .with_rotated_refresh_token(grant.refresh_token);

        let written = match tokio::time::timeout(
            self.store_timeout,
            self.store.upsert(user_id, update),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        };

        if let Err(store_err) = written {
            let err = TokenError::persistence(store_err.to_string());
            self.logger
                .log_error(&store_err, ctx().with_code(err.kind().as_str()))
                .await;
            return Err(err);
        }

        self.logger
            .info(
                "access token refreshed",
                ctx()
                    .with_field("expiry_date", expiry_date.to_rfc3339())
                    .with_field("refresh_token_rotated", rotated),
            )
            .await;

        Ok(RefreshedToken {
            access_token: grant.access_token,
            expiry_date,
        })
    }

    async fn refresh_failed(&self, user_id: &str, err: TokenError) -> TokenError {
        self.logger
            .error(
                &format!("token refresh failed: {}", err),
                LogContext::new()
                    .with_user(user_id)
                    .with_code(err.kind().as_str()),
            )
            .await;
        err
    }
}
