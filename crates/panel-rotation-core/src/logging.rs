//! Structured logging for the rotation engine
//!
//! Uses `tracing` for events and `tracing-subscriber` to assemble the output
//! pipeline. Library code only emits events; a host that wants them printed
//! calls [`init_logging`] once at startup (or installs its own subscriber).
//!
//! # Correlation Fields
//!
//! Use these field names consistently in spans and events:
//! - `panel_id`: Panel identifier
//! - `object_id`: Selected object identifier
//! - `mode`: Rotation mode (cycle, history)
//! - `queue_len`: Rotation queue length at the time of the event
//! - `elapsed_ms`: Time an update had been in flight

pub use crate::config::LogFormat;
use serde::{Deserialize, Serialize};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Global flag to track if logging has been initialized
static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error)
    /// Can be overridden by RUST_LOG environment variable
    pub level: String,

    /// Output format (pretty or json)
    pub format: LogFormat,

    /// Optional path to log file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Error type for logging initialization
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to create log file: {0}")]
    FileCreate(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn ensure_parent_dir(path: &std::path::Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let existed = parent.exists();
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            if !existed {
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
            #[cfg(not(unix))]
            let _ = existed;
        }
    }
    Ok(())
}

fn open_log_file(path: &std::path::Path) -> io::Result<std::fs::File> {
    ensure_parent_dir(path)?;
    let existed = path.exists();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    #[cfg(unix)]
    if !existed {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = existed;
    Ok(file)
}

/// Initialize the global logging subscriber
///
/// Call once at host startup. Subsequent calls return
/// `Err(LogError::AlreadyInitialized)`.
///
/// The `RUST_LOG` environment variable overrides the configured level, for
/// example `RUST_LOG=panel_rotation_core=debug`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    config
        .level
        .parse::<LogLevel>()
        .map_err(|_| LogError::InvalidLevel(config.level.clone()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_writer = match &config.file {
        Some(path) => Some(open_log_file(path)?),
        None => None,
    };

    match config.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(true),
            );

            if let Some(file) = file_writer {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_target(true)
                    .with_ansi(false);
                tracing::subscriber::set_global_default(subscriber.with(file_layer))?;
            } else {
                tracing::subscriber::set_global_default(subscriber)?;
            }
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_timer(SystemTime)
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true),
            );

            if let Some(file) = file_writer {
                let file_layer = fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_timer(SystemTime)
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true);
                tracing::subscriber::set_global_default(subscriber.with(file_layer))?;
            } else {
                tracing::subscriber::set_global_default(subscriber)?;
            }
        }
    }

    let _ = LOGGING_INITIALIZED.set(true);

    tracing::info!(
        log_level = %config.level,
        log_format = %config.format,
        log_file = ?config.file,
        "Logging initialized"
    );

    Ok(())
}

/// Check if logging has been initialized
pub fn is_logging_initialized() -> bool {
    LOGGING_INITIALIZED.get().is_some()
}

/// Create a span with standard correlation fields
///
/// ```ignore
/// let span = panel_rotation_core::rotation_span!("dispatch", panel_id = 3, mode = "cycle");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! rotation_span {
    ($name:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug_span!($name $(, $field = $value)*)
    };
}

/// Log levels that can be used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown log level: {s}. Expected one of: trace, debug, info, warn, error"
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing_subscriber::fmt::MakeWriter;

    /// A mock writer that captures output to a shared buffer for testing
    #[derive(Clone, Default)]
    pub(crate) struct MockLogWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl MockLogWriter {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.buffer.lock().clone()).unwrap()
        }
    }

    impl io::Write for MockLogWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for MockLogWriter {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
    }

    #[test]
    fn log_format_display() {
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn log_level_from_str() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("invalid".parse::<LogLevel>().is_err());
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
    }

    #[test]
    fn log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
    }

    #[test]
    fn json_logs_carry_correlation_fields() {
        let writer = MockLogWriter::new();
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(
                fmt::layer()
                    .json()
                    .with_timer(SystemTime)
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(writer.clone()),
            );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(panel_id = 3u64, mode = "cycle", "rotated");
        });

        let output = writer.contents();
        let line = output.lines().find(|line| !line.trim().is_empty()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();

        assert!(parsed.get("timestamp").is_some());
        assert_eq!(
            parsed.get("panel_id").and_then(serde_json::Value::as_u64),
            Some(3)
        );
        assert_eq!(parsed.get("mode").and_then(|v| v.as_str()), Some("cycle"));
    }

    #[test]
    fn log_error_display() {
        assert_eq!(
            LogError::AlreadyInitialized.to_string(),
            "logging already initialized"
        );
        assert_eq!(
            LogError::InvalidLevel("verbose".to_string()).to_string(),
            "invalid log level: verbose"
        );
        let err: LogError = io::Error::new(io::ErrorKind::NotFound, "no such file").into();
        assert!(matches!(err, LogError::FileCreate(_)));
    }

    #[test]
    fn open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("rotation.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
        #[cfg(unix)]
        {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
