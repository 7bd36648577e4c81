//! Structured application logger.
//!
//! A [`Logger`] is an explicit handle built once at startup with two
//! injected sinks:
//!
//! - a console sink, written on every call that passes the level filter
//!   (normally [`TracingSink`], which forwards to the `tracing` subscriber);
//! - an optional persistent sink, written only for `error` and `warn`
//!   (for example [`JsonLinesSink`]).
//!
//! Persistent-sink failures never reach the caller, and writes are bounded by
//! [`LoggerConfig::sink_timeout`]. Failures are reported on the
//! console sink and dropped.
//!
//! ```ignore
//! let logger = Logger::new(LoggerConfig::default(), Arc::new(TracingSink), Some(sink));
//! let calendar = logger.child("google-calendar");
//! calendar
//!     .error("calendar listing failed", LogContext::new().with_code("network"))
//!     .await;
//! ```

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Service tag used when neither the logger nor the call names one.
pub const DEFAULT_SERVICE: &str = "system";

/// Default bound on a persistent-sink write.
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 5;

/// A boxed future, used to keep [`LogSink`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Log severity. Lower priority number means more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Numeric priority: error=0, warn=1, info=2, debug=3.
    pub fn priority(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
        }
    }

    /// Whether a call at this level passes a `minimum` threshold.
    pub fn passes(self, minimum: LogLevel) -> bool {
        self.priority() <= minimum.priority()
    }

    /// Whether this level is written to the persistent sink.
    pub fn is_persisted(self) -> bool {
        matches!(self, Self::Error | Self::Warn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

/// Caller-supplied context for a single log call.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub service: Option<String>,
    pub error_type: Option<String>,
    pub error_code: Option<String>,
    pub stack: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub metadata: Map<String, Value>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Adds one metadata field. Later values replace earlier ones.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Per-call request context stored with each entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// One logged event, in the shape appended to the persistent log store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_id: String,
    pub request_context: RequestContext,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A sink could not accept an entry.
#[derive(Debug, Error)]
#[error("log sink unavailable: {message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Destination for log entries.
pub trait LogSink: Send + Sync {
    /// Short name used when reporting sink failures.
    fn name(&self) -> &str;

    /// Writes one entry.
    fn write<'a>(&'a self, entry: &'a LogEntry) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Console sink that forwards entries to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write<'a>(&'a self, entry: &'a LogEntry) -> BoxFuture<'a, Result<(), SinkError>> {
        let service = entry.service.as_str();
        let user = entry.user_id.as_deref().unwrap_or("-");
        let code = entry.error_code.as_deref().unwrap_or("-");
        let request = entry.request_context.request_id.as_str();
        match entry.level {
            LogLevel::Error => {
                tracing::error!(service, user, code, request, "{}", entry.message)
            }
            LogLevel::Warn => tracing::warn!(service, user, code, request, "{}", entry.message),
            LogLevel::Info => tracing::info!(service, user, request, "{}", entry.message),
            LogLevel::Debug => tracing::debug!(service, user, request, "{}", entry.message),
        }
        Box::pin(async { Ok(()) })
    }
}

/// Append-only JSON-lines file sink.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| SinkError::new(format!("failed to serialize entry: {}", e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::new(format!("failed to create log directory: {}", e)))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError::new(format!("failed to open {:?}: {}", self.path, e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::new(format!("failed to append entry: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| SinkError::new(format!("failed to flush log file: {}", e)))
    }
}

impl LogSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn write<'a>(&'a self, entry: &'a LogEntry) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.append(entry))
    }
}

/// In-memory sink. Can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write.
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Snapshot of the accepted entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write<'a>(&'a self, entry: &'a LogEntry) -> BoxFuture<'a, Result<(), SinkError>> {
        let result = if self.failing {
            Err(SinkError::new("memory sink is in failing mode"))
        } else {
            self.entries
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(entry.clone());
            Ok(())
        };
        Box::pin(async move { result })
    }
}

/// Logger settings.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Calls below this level are dropped.
    pub min_level: LogLevel,
    /// Whether warn/error entries go to the persistent sink.
    pub persist: bool,
    /// Deployment environment recorded in entry metadata.
    pub environment: String,
    /// Application version recorded in entry metadata.
    pub version: String,
    /// Longest wait for one persistent-sink write.
    pub sink_timeout: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            persist: true,
            environment: "development".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            sink_timeout: Duration::from_secs(DEFAULT_SINK_TIMEOUT_SECS),
        }
    }
}

impl LoggerConfig {
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }
}

struct Shared {
    config: LoggerConfig,
    console: Arc<dyn LogSink>,
    persistent: Option<Arc<dyn LogSink>>,
    session_id: String,
}

/// Handle to the process logger. Cloning is cheap; clones share sinks and
/// session id.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    service: Option<String>,
    user_id: Option<String>,
    request_id: Option<String>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.shared.config.min_level)
            .field("console", &self.shared.console.name())
            .field(
                "persistent",
                &self.shared.persistent.as_ref().map(|s| s.name().to_string()),
            )
            .field("session_id", &self.shared.session_id)
            .field("service", &self.service)
            .finish()
    }
}

impl Logger {
    /// Builds a root logger with a fresh session id.
    pub fn new(
        config: LoggerConfig,
        console: Arc<dyn LogSink>,
        persistent: Option<Arc<dyn LogSink>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                console,
                persistent,
                session_id: uuid::Uuid::new_v4().to_string(),
            }),
            service: None,
            user_id: None,
            request_id: None,
        }
    }

    /// Console-only logger writing through `tracing`.
    pub fn tracing_only(config: LoggerConfig) -> Self {
        Self::new(config, Arc::new(TracingSink), None)
    }

    /// A view bound to `service`, sharing sinks and session id.
    pub fn child(&self, service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..self.clone()
        }
    }

    /// Binds a user id used when a call's context carries none.
    pub fn with_user(&self, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..self.clone()
        }
    }

    /// Binds a request id used when a call's context carries none.
    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..self.clone()
        }
    }

    /// Generates an id suitable for [`with_request_id`](Self::with_request_id).
    pub fn new_request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or(DEFAULT_SERVICE)
    }

    pub fn min_level(&self) -> LogLevel {
        self.shared.config.min_level
    }

    /// Logs `message` at `level`.
    ///
    /// The console sink is always written when the level passes the filter;
    /// warn and error additionally go to the persistent sink.
    pub async fn log(&self, level: LogLevel, message: &str, ctx: LogContext) {
        if !level.passes(self.shared.config.min_level) {
            return;
        }

        let entry = self.build_entry(level, message, ctx);

        // Console sink failures have nowhere else to go.
        let _ = self.shared.console.write(&entry).await;

        if !level.is_persisted() || !self.shared.config.persist {
            return;
        }
        let Some(sink) = self.shared.persistent.as_ref() else {
            return;
        };

        let timeout = self.shared.config.sink_timeout;
        let failure = match tokio::time::timeout(timeout, sink.write(&entry)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("write timed out after {:?}", timeout)),
        };

        if let Some(reason) = failure {
            let notice = self.build_entry(
                LogLevel::Error,
                &format!("failed to write log to {} sink: {}", sink.name(), reason),
                LogContext::new()
                    .with_service("logger")
                    .with_code("sink_write_failed")
                    .with_field("original_message", entry.message.clone()),
            );
            let _ = self.shared.console.write(&notice).await;
        }
    }

    pub async fn error(&self, message: &str, ctx: LogContext) {
        self.log(LogLevel::Error, message, ctx).await;
    }

    pub async fn warn(&self, message: &str, ctx: LogContext) {
        self.log(LogLevel::Warn, message, ctx).await;
    }

    pub async fn info(&self, message: &str, ctx: LogContext) {
        self.log(LogLevel::Info, message, ctx).await;
    }

    pub async fn debug(&self, message: &str, ctx: LogContext) {
        self.log(LogLevel::Debug, message, ctx).await;
    }

    /// Logs a caught error at `error` level, recording its source chain as
    /// the stack text.
    pub async fn log_error(
        &self,
        err: &(dyn std::error::Error + Send + Sync + 'static),
        ctx: LogContext,
    ) {
        let mut ctx = ctx;
        if ctx.stack.is_none() {
            ctx.stack = Some(error_chain(err));
        }
        let message = err.to_string();
        self.log(LogLevel::Error, &message, ctx).await;
    }

    fn build_entry(&self, level: LogLevel, message: &str, ctx: LogContext) -> LogEntry {
        let service = self
            .service
            .clone()
            .or(ctx.service)
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string());

        let request_id = ctx
            .request_id
            .or_else(|| self.request_id.clone())
            .unwrap_or_else(Self::new_request_id);

        let mut metadata = ctx.metadata;
        metadata.insert(
            "environment".to_string(),
            Value::String(self.shared.config.environment.clone()),
        );
        metadata.insert(
            "version".to_string(),
            Value::String(self.shared.config.version.clone()),
        );

        LogEntry {
            level,
            service,
            error_type: ctx.error_type,
            message: message.to_string(),
            stack_trace: ctx.stack,
            error_code: ctx.error_code,
            user_id: ctx.user_id.or_else(|| self.user_id.clone()),
            session_id: self.shared.session_id.clone(),
            request_context: RequestContext {
                request_id,
                timestamp: Utc::now(),
            },
            metadata,
        }
    }
}

/// Renders an error and its sources, one per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger_with(
        config: LoggerConfig,
        persistent: Option<Arc<MemorySink>>,
    ) -> (Logger, Arc<MemorySink>) {
        let console = Arc::new(MemorySink::new());
        let logger = Logger::new(
            config,
            console.clone(),
            persistent.map(|p| p as Arc<dyn LogSink>),
        );
        (logger, console)
    }

    #[test]
    fn level_priorities_and_filter() {
        assert_eq!(LogLevel::Error.priority(), 0);
        assert_eq!(LogLevel::Debug.priority(), 3);
        assert!(LogLevel::Error.passes(LogLevel::Info));
        assert!(LogLevel::Info.passes(LogLevel::Info));
        assert!(!LogLevel::Debug.passes(LogLevel::Info));
        assert!(!LogLevel::Warn.passes(LogLevel::Error));
    }

    #[test]
    fn level_parsing() {
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" debug ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[tokio::test]
    async fn info_goes_to_console_only() {
        let persistent = Arc::new(MemorySink::new());
        let (logger, console) = logger_with(LoggerConfig::default(), Some(persistent.clone()));

        logger.info("dashboard loaded", LogContext::new()).await;

        assert_eq!(console.len(), 1);
        assert!(persistent.is_empty());
    }

    #[tokio::test]
    async fn error_goes_to_both_sinks_with_context() {
        let persistent = Arc::new(MemorySink::new());
        let (logger, console) = logger_with(
            LoggerConfig::default().with_environment("production"),
            Some(persistent.clone()),
        );

        logger
            .error(
                "calendar listing failed",
                LogContext::new()
                    .with_service("google-calendar")
                    .with_code("network")
                    .with_user("user-1")
                    .with_field("endpoint", "/api/calendar"),
            )
            .await;

        assert_eq!(console.len(), 1);
        let entries = persistent.entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.service, "google-calendar");
        assert_eq!(entry.error_code.as_deref(), Some("network"));
        assert_eq!(entry.user_id.as_deref(), Some("user-1"));
        assert_eq!(entry.session_id, logger.session_id());
        assert_eq!(entry.metadata["endpoint"], "/api/calendar");
        assert_eq!(entry.metadata["environment"], "production");
        assert!(entry.metadata.contains_key("version"));
    }

    #[tokio::test]
    async fn min_level_suppresses_all_sinks() {
        let persistent = Arc::new(MemorySink::new());
        let (logger, console) = logger_with(
            LoggerConfig::default().with_min_level(LogLevel::Error),
            Some(persistent.clone()),
        );

        logger.warn("slow response", LogContext::new()).await;
        logger.debug("noise", LogContext::new()).await;

        assert!(console.is_empty());
        assert!(persistent.is_empty());
    }

    #[tokio::test]
    async fn persist_switch_disables_persistent_sink() {
        let persistent = Arc::new(MemorySink::new());
        let (logger, console) = logger_with(
            LoggerConfig::default().with_persist(false),
            Some(persistent.clone()),
        );

        logger.error("boom", LogContext::new()).await;

        assert_eq!(console.len(), 1);
        assert!(persistent.is_empty());
    }

    #[tokio::test]
    async fn failing_persistent_sink_is_reported_on_console_only() {
        let persistent = Arc::new(MemorySink::failing());
        let (logger, console) = logger_with(LoggerConfig::default(), Some(persistent.clone()));

        logger.error("token refresh failed", LogContext::new()).await;

        let console_entries = console.entries();
        assert_eq!(console_entries.len(), 2);
        assert_eq!(console_entries[0].message, "token refresh failed");
        assert_eq!(console_entries[1].service, "logger");
        assert_eq!(
            console_entries[1].error_code.as_deref(),
            Some("sink_write_failed")
        );
        assert!(persistent.is_empty());
    }

    struct StalledSink;

    impl LogSink for StalledSink {
        fn name(&self) -> &str {
            "stalled"
        }

        fn write<'a>(&'a self, _entry: &'a LogEntry) -> BoxFuture<'a, Result<(), SinkError>> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn stalled_persistent_sink_times_out() {
        let console = Arc::new(MemorySink::new());
        let logger = Logger::new(
            LoggerConfig::default().with_sink_timeout(Duration::from_millis(20)),
            console.clone(),
            Some(Arc::new(StalledSink)),
        );

        tokio::time::timeout(
            Duration::from_secs(2),
            logger.error("token refresh failed", LogContext::new()),
        )
        .await
        .unwrap();

        let entries = console.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].error_code.as_deref(), Some("sink_write_failed"));
        assert!(entries[1].message.contains("stalled sink"));
        assert!(entries[1].message.contains("timed out"));
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn log_futures_are_send() {
        let logger = Logger::tracing_only(LoggerConfig::default());
        let err = std::io::Error::other("disk full");
        assert_send(logger.log_error(&err, LogContext::new()));
        assert_send(logger.error("boom", LogContext::new()));
    }

    #[tokio::test]
    async fn child_binds_service_and_shares_session() {
        let (logger, console) = logger_with(LoggerConfig::default(), None);
        let child = logger.child("google-token");

        assert_eq!(child.session_id(), logger.session_id());
        assert_eq!(child.service(), "google-token");
        assert_eq!(logger.service(), DEFAULT_SERVICE);

        child
            .info("refreshed", LogContext::new().with_service("ignored"))
            .await;
        logger.info("plain", LogContext::new()).await;

        let entries = console.entries();
        assert_eq!(entries[0].service, "google-token");
        assert_eq!(entries[1].service, DEFAULT_SERVICE);
    }

    #[tokio::test]
    async fn bound_user_and_request_are_fallbacks() {
        let (logger, console) = logger_with(LoggerConfig::default(), None);
        let scoped = logger.with_user("user-7").with_request_id("req-1");

        scoped.info("first", LogContext::new()).await;
        scoped
            .info("second", LogContext::new().with_user("user-8"))
            .await;

        let entries = console.entries();
        assert_eq!(entries[0].user_id.as_deref(), Some("user-7"));
        assert_eq!(entries[0].request_context.request_id, "req-1");
        assert_eq!(entries[1].user_id.as_deref(), Some("user-8"));
    }

    #[tokio::test]
    async fn log_error_records_source_chain() {
        #[derive(Debug, Error)]
        #[error("store write failed")]
        struct Outer(#[source] std::io::Error);

        let (logger, console) = logger_with(LoggerConfig::default(), None);
        let err = Outer(std::io::Error::other("disk full"));

        logger.log_error(&err, LogContext::new()).await;

        let entries = console.entries();
        assert_eq!(entries[0].message, "store write failed");
        assert_eq!(
            entries[0].stack_trace.as_deref(),
            Some("store write failed\ncaused by: disk full")
        );
    }

    #[tokio::test]
    async fn json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("errors.jsonl");
        let sink = Arc::new(JsonLinesSink::new(&path));
        let console = Arc::new(MemorySink::new());
        let logger = Logger::new(LoggerConfig::default(), console, Some(sink));

        logger.error("first", LogContext::new()).await;
        logger.warn("second", LogContext::new()).await;
        logger.info("not persisted", LogContext::new()).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<LogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "first");
        assert_eq!(lines[1].level, LogLevel::Warn);
    }

    #[test]
    fn entry_json_shape() {
        use chrono::TimeZone;

        let mut metadata = Map::new();
        metadata.insert("environment".to_string(), Value::from("production"));
        metadata.insert("version".to_string(), Value::from("1.0.0"));

        let entry = LogEntry {
            level: LogLevel::Warn,
            service: "google-token".to_string(),
            error_type: None,
            message: "token expiring".to_string(),
            stack_trace: None,
            error_code: Some("provider_rejected".to_string()),
            user_id: Some("user-1".to_string()),
            session_id: "session-1".to_string(),
            request_context: RequestContext {
                request_id: "req-1".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
            },
            metadata,
        };

        insta::assert_json_snapshot!(entry, @r#"
        {
          "level": "warn",
          "service": "google-token",
          "message": "token expiring",
          "error_code": "provider_rejected",
          "user_id": "user-1",
          "session_id": "session-1",
          "request_context": {
            "request_id": "req-1",
            "timestamp": "2024-03-15T10:00:00Z"
          },
          "metadata": {
            "environment": "production",
            "version": "1.0.0"
          }
        }
        "#);
    }
}
