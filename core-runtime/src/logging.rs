//! # Logging
//!
//! Installs the global `tracing` subscriber for the sync core.
//!
//! ## Overview
//!
//! - Pretty output in debug builds, flattened JSON in release builds
//! - Workspace crates log at the configured level; dependencies (sqlx in
//!   particular) only at `warn`
//! - An optional [`LoggerSink`] receives a copy of every event at or above its
//!   own minimum level, so a host app can route sync progress into its log UI
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig};
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//!
//! let config = LoggingConfig::default()
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//! init_logging(config)?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const WORKSPACE_CRATES: &[&str] = &[
    "core_runtime",
    "core_library",
    "core_metadata",
    "core_sync",
    "bridge_desktop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the workspace crates.
    pub level: LogLevel,
    /// Full `EnvFilter` directive, replacing the level-based default.
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close, which brackets each sync run.
    pub spans: bool,
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("spans", &self.spans)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            spans: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, spans: bool) -> Self {
        self.spans = spans;
        self
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`Error::Config`] for an invalid filter, or when a subscriber is already
/// installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let span_events = if config.spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(HostSinkLayer(config.logger_sink.clone()));

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(span_events)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_events(span_events)
                    .with_writer(io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(filter) => filter.clone(),
        None => {
            let level = config.level.as_str();
            let mut directives = vec!["warn".to_string(), "sqlx=warn".to_string()];
            directives.extend(WORKSPACE_CRATES.iter().map(|name| format!("{name}={level}")));
            directives.join(",")
        }
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter {directives:?}: {e}")))
}

fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Mirrors events into the host's [`LoggerSink`].
struct HostSinkLayer(Option<Arc<dyn LoggerSink>>);

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.0 else {
            return;
        };
        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut collected = EntryFields::default();
        event.record(&mut collected);
        let message = collected
            .message
            .unwrap_or_else(|| metadata.name().to_string());

        let mut entry = LogEntry::new(level, metadata.target(), message);
        entry.fields = collected.fields.into_iter().collect();
        if let Some(span) = ctx.event_span(event) {
            entry = entry.with_span_id(span.name());
        }

        deliver(Arc::clone(sink), entry);
    }
}

fn deliver(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("log sink failed: {err}");
                }
            });
        }
        Err(_) => match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => {
                if let Err(err) = runtime.block_on(sink.log(entry)) {
                    eprintln!("log sink failed: {err}");
                }
            }
            Err(err) => eprintln!("log sink runtime unavailable: {err}"),
        },
    }
}

#[derive(Default)]
struct EntryFields {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl EntryFields {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for EntryFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

/// File name of a cover path, for log lines that should not carry the
/// user's directory layout.
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LogEntry>>);

    #[async_trait]
    impl LoggerSink for Recorder {
        async fn log(&self, entry: LogEntry) -> bridge_traits::error::Result<()> {
            self.0.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    #[test]
    fn test_default_filter_covers_workspace() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();
        assert!(filter.contains("core_sync=debug"));
        assert!(filter.contains("core_library=debug"));
        assert!(filter.contains("sqlx=warn"));
    }

    #[test]
    fn test_custom_filter_is_validated() {
        assert!(build_filter(&LoggingConfig::default().with_filter("core_sync=trace")).is_ok());
        assert!(build_filter(&LoggingConfig::default().with_filter("core_sync=loud")).is_err());
    }

    #[test]
    fn test_sink_receives_fields_and_span() {
        let recorder = Arc::new(Recorder::default());
        let sink: Arc<dyn LoggerSink> = recorder.clone();
        let subscriber = tracing_subscriber::registry().with(HostSinkLayer(Some(sink)));
        let _guard = tracing::subscriber::set_default(subscriber);

        let span = tracing::info_span!("read");
        let _entered = span.enter();
        tracing::trace!("too detailed");
        tracing::debug!(target: "core_sync", uuid = "9b0f", slot = 1, "Stored cover");

        let entries = recorder.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Stored cover");
        assert_eq!(entries[0].target, "core_sync");
        assert_eq!(entries[0].fields.get("uuid").map(String::as_str), Some("9b0f"));
        assert_eq!(entries[0].fields.get("slot").map(String::as_str), Some("1"));
        assert_eq!(entries[0].span_id.as_deref(), Some("read"));
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/data/covers/5f1c.jpg"), "5f1c.jpg");
        assert_eq!(strip_path("D:\\covers\\5f1c_1.jpg"), "5f1c_1.jpg");
        assert_eq!(strip_path("5f1c.jpg"), "5f1c.jpg");
    }
}
