//! # Logging
//!
//! Installs the global `tracing` subscriber for a host application.
//!
//! Output goes to stdout in one of three [`LogFormat`]s. Independently of
//! the format, events can be mirrored into a host [`LoggerSink`] (a log
//! panel, a file). Explorer events carry user paths in fields such as
//! `path` and `folder`; with [`LoggingConfig::with_path_redaction`] the sink
//! only sees their last component.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_logger_sink(host_sink)
//!     .with_path_redaction(true);
//! init_logging(config).expect("Failed to initialize logging");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::error::{Error, Result};

/// Crates covered by the default filter
const WORKSPACE_TARGETS: &[&str] = &[
    "el_explorer",
    "core_runtime",
    "core_library",
    "core_sync",
    "core_service",
    "bridge_desktop",
];

/// Event fields that hold a user path
const PATH_FIELDS: &[&str] = &["path", "folder", "root", "from", "to", "dest"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, for a developer terminal
    Pretty,
    Json,
    /// One line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the workspace crates; everything else logs at warn
    pub level: LogLevel,
    /// Full `EnvFilter` directive replacing the per-crate default
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log the closing of `#[instrument]` spans
    pub enable_spans: bool,
    pub display_target: bool,
    /// Reduce path fields to their last component before they reach the sink
    pub redact_paths: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            redact_paths: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .field("redact_paths", &self.redact_paths)
            .finish_non_exhaustive()
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

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_path_redaction(mut self, redact: bool) -> Self {
        self.redact_paths = redact;
        self
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`Error::Config`] for an invalid filter, or when a global subscriber is
/// already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = SinkLayer {
        sink: config.logger_sink.clone(),
        redact_paths: config.redact_paths,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output_layer(&config))
        .with(sink_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => std::iter::once("warn".to_string())
            .chain(
                WORKSPACE_TARGETS
                    .iter()
                    .map(|target| format!("{}={}", target, config.level.as_str())),
            )
            .collect::<Vec<_>>()
            .join(","),
    };

    EnvFilter::try_new(directives).map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::layer::Layered<EnvFilter, Registry>> + Send + Sync>;

fn output_layer(config: &LoggingConfig) -> BoxedLayer {
    let spans = if config.enable_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => base.pretty().with_span_events(spans).boxed(),
        LogFormat::Compact => base.compact().with_span_events(spans).boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(false)
            .boxed(),
    }
}

/// Mirrors events into the host's [`LoggerSink`]
struct SinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact_paths: bool,
}

impl SinkLayer {
    fn entry_for(&self, event: &Event<'_>) -> LogEntry {
        let metadata = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(to_log_level(metadata.level()), metadata.target(), message);
        for (name, value) in fields.values {
            let value = if self.redact_paths && PATH_FIELDS.contains(&name.as_str()) {
                strip_path(&value).to_string()
            } else {
                value
            };
            entry = entry.with_field(name, value);
        }
        entry
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };
        if to_log_level(event.metadata().level()) < sink.min_level() {
            return;
        }

        let mut entry = self.entry_for(event);
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span(span.name());
        }

        // never block an explorer operation on the host's logger
        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("LoggerSink error: {}", e);
                    }
                });
            }
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("LoggerSink error: {}", e);
                }
            }
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: BTreeMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }
}

impl FieldCollector {
    fn record(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

fn to_log_level(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Last component of a path, for logs shared outside the machine.
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/media/usb/SONG_001"), "SONG_001");
/// assert_eq!(strip_path("E:\\Electone\\ELS_SONG.NAM"), "ELS_SONG.NAM");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Info
        }
    }

    fn with_sink<F: FnOnce()>(redact_paths: bool, emit: F) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let layer = SinkLayer {
            sink: Some(sink.clone() as Arc<dyn LoggerSink>),
            redact_paths,
        };
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.starts_with("warn"));
        for target in WORKSPACE_TARGETS {
            assert!(filter.contains(&format!("{}=debug", target)), "{}", filter);
        }
    }

    #[test]
    fn test_invalid_custom_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_sync=[");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_sink_receives_message_and_fields() {
        let entries = with_sink(false, || {
            tracing::warn!(target: "core_sync", path = "/a/SONG_001", count = 2, "Duplicate item path");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.target, "core_sync");
        assert_eq!(entry.message, "Duplicate item path");
        assert_eq!(entry.fields.get("path").map(String::as_str), Some("/a/SONG_001"));
        assert_eq!(entry.fields.get("count").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_sink_redacts_path_fields() {
        let entries = with_sink(true, || {
            tracing::info!(folder = "/media/usb/SETS", song = "Intro", "Saved folder");
        });

        let fields = &entries[0].fields;
        assert_eq!(fields.get("folder").map(String::as_str), Some("SETS"));
        assert_eq!(fields.get("song").map(String::as_str), Some("Intro"));
    }

    #[test]
    fn test_sink_respects_min_level() {
        let entries = with_sink(false, || tracing::debug!("below the sink's level"));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/media/usb/SONG_001/B00.BLK"), "B00.BLK");
        assert_eq!(strip_path("ELS_SONG.NAM"), "ELS_SONG.NAM");
        assert_eq!(strip_path("/media/usb/"), "");
    }
}
