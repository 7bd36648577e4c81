//! Fakes shared by the unit tests in this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use lifedash_core::{
    BoxFuture, FixedClock, LogEntry, LogSink, Logger, LoggerConfig, MemorySink, SinkError,
};

use crate::config::{GoogleConfig, OAuthCredentials};
use crate::error::{StoreError, TokenError};
use crate::oauth::{TokenExchange, TokenGrant};
use crate::store::{MemoryTokenStore, TokenStore};
use crate::token::{GoogleToken, TokenUpdate};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
}

pub(crate) fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(t0()))
}

pub(crate) fn test_config() -> GoogleConfig {
    GoogleConfig::new(OAuthCredentials::new(
        "test-client.apps.googleusercontent.com",
        "test-secret",
    ))
}

/// Logger writing into in-memory console and persistent sinks.
pub(crate) fn test_logger() -> (Logger, Arc<MemorySink>, Arc<MemorySink>) {
    let console = Arc::new(MemorySink::new());
    let persistent = Arc::new(MemorySink::new());
    let logger = Logger::new(
        LoggerConfig::default(),
        console.clone() as Arc<dyn LogSink>,
        Some(persistent.clone() as Arc<dyn LogSink>),
    );
    (logger, console, persistent)
}

pub(crate) fn stored_token(
    user_id: &str,
    access: &str,
    refresh: Option<&str>,
    expiry: DateTime<Utc>,
) -> GoogleToken {
    GoogleToken {
        user_id: user_id.to_string(),
        access_token: access.to_string(),
        refresh_token: refresh.map(String::from),
        expiry_date: expiry,
        updated_at: t0() - chrono::Duration::hours(1),
    }
}

/// Token endpoint fake that counts calls and returns a fixed outcome.
pub(crate) struct FakeExchange {
    outcome: Mutex<Result<TokenGrant, TokenError>>,
    calls: AtomicUsize,
    last_credential: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl FakeExchange {
    pub(crate) fn granting(access: &str, expires_in: i64) -> Self {
        Self::with_outcome(Ok(TokenGrant {
            access_token: access.to_string(),
            expires_in,
            refresh_token: None,
            token_type: Some("Bearer".to_string()),
            scope: None,
        }))
    }

    pub(crate) fn failing(err: TokenError) -> Self {
        Self::with_outcome(Err(err))
    }

    pub(crate) fn with_outcome(outcome: Result<TokenGrant, TokenError>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            last_credential: Mutex::new(None),
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set_outcome(&self, outcome: Result<TokenGrant, TokenError>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_credential(&self) -> Option<String> {
        self.last_credential.lock().unwrap().clone()
    }

    fn respond<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<TokenGrant, TokenError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_credential.lock().unwrap() = Some(credential.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome.lock().unwrap().clone()
        })
    }
}

impl TokenExchange for FakeExchange {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenGrant, TokenError>> {
        self.respond(refresh_token)
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<TokenGrant, TokenError>> {
        self.respond(code)
    }
}

/// Memory store whose operations can be made to fail or stall.
#[derive(Default)]
pub(crate) struct FlakyStore {
    pub(crate) inner: MemoryTokenStore,
    fail_get: AtomicBool,
    fail_upsert: AtomicBool,
    upsert_delay: Mutex<Option<Duration>>,
    upserts: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn with_token(token: GoogleToken) -> Self {
        let store = Self::default();
        store.inner.insert(token);
        store
    }

    pub(crate) fn fail_get(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_upsert(&self) {
        self.fail_upsert.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stall_upsert(&self, delay: Duration) {
        *self.upsert_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

impl TokenStore for FlakyStore {
    fn get<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<GoogleToken>, StoreError>> {
        Box::pin(async move {
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.inner.get(user_id).await
        })
    }

    fn upsert<'a>(
        &'a self,
        user_id: &'a str,
        update: TokenUpdate,
    ) -> BoxFuture<'a, Result<GoogleToken, StoreError>> {
        Box::pin(async move {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            let delay = *self.upsert_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_upsert.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("write rejected".to_string()));
            }
            self.inner.upsert(user_id, update).await
        })
    }
}

/// Log sink whose writes never complete.
pub(crate) struct StalledSink;

impl LogSink for StalledSink {
    fn name(&self) -> &str {
        "stalled"
    }

    fn write<'a>(&'a self, _entry: &'a LogEntry) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(std::future::pending())
    }
}
