use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct WarningsOnly {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for WarningsOnly {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

// The subscriber is process-global, so installation is checked in one test.
#[test]
fn test_init_logging_once_and_forward_to_sink() {
    let sink = Arc::new(WarningsOnly::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_filter("info")
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first init succeeds");

    tracing::info!(target: "core_sync", "Read finished");
    tracing::warn!(target: "core_sync", book_id = 7, "Failed to read book");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Failed to read book");
        assert_eq!(entries[0].fields.get("book_id"), Some(&"7".to_string()));
    }

    assert!(init_logging(LoggingConfig::default()).is_err());
}

#[test]
fn test_invalid_filter_is_config_error() {
    let config = LoggingConfig::default().with_filter("core_sync=notalevel");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Pretty)
        .with_level(LogLevel::Warn)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.spans);
    assert!(config.logger_sink.is_none());
}
