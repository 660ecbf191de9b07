//! Bridges the `log` records emitted by this crate to a host-provided sink.

use std::sync::{Arc, OnceLock};

/// Receives log messages from the crate.
///
/// # Examples
///
/// ```rust
/// use tablekit::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information, such as failed statements.
    Debug,
    /// Progress information.
    Info,
    /// Recoverable oddities, such as defaulted insert columns.
    Warn,
    /// Failed operations.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// `log::Log` implementation forwarding to the installed [`Logger`].
struct ForwardingLogger;

impl ForwardingLogger {
    /// Debug and trace records are only forwarded from this workspace's own
    /// modules.
    fn accepts(metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info || metadata.target().starts_with("tablekit")
    }
}

impl log::Log for ForwardingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Self::accepts(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !Self::accepts(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination of every record logged by the crate.
///
/// Only the first call takes effect. Later calls, or a call made after
/// another `log` implementation was registered, are reported on stderr and
/// otherwise ignored.
pub fn set_logger(logger: Arc<dyn Logger>) {
    static FORWARDER: ForwardingLogger = ForwardingLogger;
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }
    match log::set_logger(&FORWARDER) {
        Ok(()) => log::set_max_level(log::LevelFilter::Trace),
        Err(err) => eprintln!("Failed to set logger: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversion() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }

    #[test]
    fn test_foreign_debug_records_are_filtered() {
        let foreign = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("hyper::client")
            .build();
        let own = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("tablekit::executor")
            .build();
        let warning = log::Metadata::builder()
            .level(log::Level::Warn)
            .target("hyper::client")
            .build();
        assert!(!ForwardingLogger::accepts(&foreign));
        assert!(ForwardingLogger::accepts(&own));
        assert!(ForwardingLogger::accepts(&warning));
    }
}
