//! Core types: clock, time windows, structured logging, tracing setup

pub mod logger;
pub mod time;
pub mod tracing;

pub use logger::{
    BoxFuture, DEFAULT_SERVICE, JsonLinesSink, LogContext, LogEntry, LogLevel, LogSink, Logger,
    LoggerConfig, MemorySink, RequestContext, SinkError, TracingSink,
};
pub use time::{Clock, EventTime, FixedClock, SystemClock, TimeWindow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
