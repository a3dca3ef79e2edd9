//! Logging for the bridge
//!
//! Subscriber setup plus the structured events emitted by the converters,
//! the call marshaler and the session layer. Events use fixed targets
//! (`convert`, `marshal`, `session`) so they can be filtered independently,
//! e.g. `RUST_LOG=marshal=trace,convert=warn`.

use std::path::Path;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily-rotated file `directory/prefix.YYYY-MM-DD`.
    File { directory: String, prefix: String },
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: bool,
    /// Extra filter directives, e.g. "marshal=trace,convert=debug".
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive until shutdown so buffered events are
/// flushed. Returns `None` when a subscriber was already installed.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config);

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };
    let writer = BoxMakeWriter::new(writer);
    let spans = span_events_config(config.span_events);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_span_events(spans)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_span_events(spans)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(spans)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .ok()
        .map(|_| guard)
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    match &config.filter {
        Some(filter_str) => filter_str
            .split(',')
            .filter(|d| !d.trim().is_empty())
            .fold(base_filter, |filter, directive| match directive.trim().parse::<Directive>() {
                Ok(parsed) => filter.add_directive(parsed),
                Err(_) => {
                    tracing::warn!("Invalid filter directive: {}", directive);
                    filter
                }
            }),
        None => base_filter,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

pub fn init_dev_logging() -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::DEBUG,
        format: LogFormat::Pretty,
        output: LogOutput::Stderr,
        span_events: true,
        filter: Some("numbridge=debug,marshal=debug,session=debug".to_string()),
    })
}

pub fn init_prod_logging(log_dir: impl AsRef<Path>) -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::INFO,
        format: LogFormat::Json,
        output: LogOutput::File {
            directory: log_dir.as_ref().to_string_lossy().to_string(),
            prefix: "numbridge".to_string(),
        },
        span_events: false,
        filter: Some("convert=warn".to_string()),
    })
}

#[inline]
pub fn log_conversion(direction: &str, from: &str, to: &str) {
    trace!(target: "convert", direction, from, to, "type conversion");
}

#[inline]
pub fn log_unsupported(direction: &str, kind: &str, class_name: &str) {
    warn!(
        target: "convert",
        direction,
        kind,
        class_name,
        "no conversion rule, slot yields no value"
    );
}

#[inline]
pub fn log_cell_decision(elements: usize, collapsed: bool, class_name: &str) {
    debug!(target: "convert", elements, collapsed, class_name, "cell homogeneity");
}

#[inline]
pub fn log_call(function: &str, positional: usize, named: usize, nout: usize) {
    debug!(target: "marshal", function, positional, named, nout, "call");
}

#[inline]
pub fn log_call_return(function: &str, outputs: usize) {
    trace!(target: "marshal", function, outputs, "call returned");
}

#[inline]
pub fn log_call_fault(function: &str, fault: &str) {
    error!(target: "marshal", function, fault, "call faulted");
}

#[inline]
pub fn log_session_open(id: u64, identifier: &str, default: bool) {
    info!(target: "session", id, identifier, default, "session opened");
}

#[inline]
pub fn log_session_close(id: u64, status: i32) {
    info!(target: "session", id, status, "session closed");
}

#[inline]
pub fn log_default_session(id: Option<u64>) {
    debug!(target: "session", id, "default session changed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_filter("marshal=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.filter, Some("marshal=trace".to_string()));
    }

    #[test]
    fn test_event_helpers_without_subscriber() {
        log_conversion("to_host", "int8", "integer");
        log_unsupported("to_guest", "opaque", "externalptr");
        log_cell_decision(5, true, "double");
        log_call("sum", 1, 0, 1);
        log_call_return("sum", 1);
        log_call_fault("nosuch", "not found");
        log_session_open(1, "", true);
        log_session_close(1, 0);
        log_default_session(None);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_call_fault_keeps_message_and_fault_apart() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            log_call_fault("nosuch", "could not find function");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("call faulted"));
        assert!(output.contains("fault=\"could not find function\""));
        assert!(output.contains("function=\"nosuch\""));
    }
}
