//! Error types for panel-rotation-core

use std::fmt::Write;
use thiserror::Error;

use crate::host::PanelId;
use crate::logging::LogError;

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            alternatives: Vec::new(),
        }
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for panel-rotation-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence store errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Logging initialization errors
    #[error("Logging error: {0}")]
    Logging(#[from] LogError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Config(err) => Some(err.remediation()),
            Self::Persistence(err) => Some(err.remediation()),
            Self::Logging(LogError::AlreadyInitialized) => None,
            Self::Logging(_) => Some(
                Remediation::new("Check the [logging] section and the log file location.")
                    .alternative("Unset RUST_LOG if it carries an invalid directive."),
            ),
            Self::Io(_) => Some(
                Remediation::new("Check filesystem permissions and paths, then retry.")
                    .alternative("Verify the settings directory exists and is writable."),
            ),
            Self::Json(_) => Some(
                Remediation::new("Validate the stored JSON and retry.")
                    .alternative("Delete the affected key to fall back to defaults."),
            ),
        }
    }
}

/// Failure reported by a host capability call.
///
/// The engine never surfaces these to its callers; they are logged and folded
/// into a boolean outcome at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The panel handle no longer refers to a live panel
    #[error("panel {0} is gone")]
    PanelGone(PanelId),

    /// The host refused or failed the request
    #[error("host rejected request: {0}")]
    Rejected(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => Remediation::new(format!(
                "Config file not found: {path}. Verify the path and retry."
            ))
            .alternative("Start without a file to use built-in defaults."),
            Self::ReadFailed(path, _) => Remediation::new(format!(
                "Failed to read config file: {path}. Check permissions."
            ))
            .alternative("Ensure the file is readable by the current user."),
            Self::ParseFailed(_) => Remediation::new("Config parse failed. Fix the TOML syntax.")
                .alternative("Remove unknown values and retry."),
            Self::SerializeFailed(_) => {
                Remediation::new("Failed to serialize configuration. Check config values.")
                    .alternative("Recreate the config from known-good defaults.")
            }
            Self::ValidationError(_) => {
                Remediation::new("Config validation failed. Fix the invalid fields and retry.")
            }
        }
    }
}

/// Persistence store errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write store {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read store {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store file {0} is corrupt")]
    Corrupt(String),
}

impl PersistenceError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::WriteFailed { path, .. } | Self::ReadFailed { path, .. } => {
                Remediation::new(format!("Check permissions on the settings store: {path}"))
                    .alternative("Use an in-memory store to run without persistence.")
            }
            Self::Encode { key, .. } => {
                Remediation::new(format!("Value for key {key} could not be encoded."))
            }
            Self::Corrupt(path) => Remediation::new(format!(
                "Settings store {path} is not valid JSON. Move it aside to reset."
            )),
        }
    }
}

/// Format an error with remediation guidance for display.
#[must_use]
pub fn format_error_with_remediation(error: &Error) -> String {
    let mut output = format!("Error: {error}");
    if let Some(remediation) = error.remediation() {
        output.push('\n');
        output.push('\n');
        output.push_str(&remediation.render_plain());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_available_for_error_variants() {
        let json_err = serde_json::from_str::<serde_json::Value>("").unwrap_err();
        let errors = vec![
            Error::Config(ConfigError::FileNotFound("rotation.toml".to_string())),
            Error::Config(ConfigError::ReadFailed(
                "rotation.toml".to_string(),
                "denied".to_string(),
            )),
            Error::Config(ConfigError::ParseFailed("bad".to_string())),
            Error::Config(ConfigError::SerializeFailed("bad".to_string())),
            Error::Config(ConfigError::ValidationError("bad".to_string())),
            Error::Persistence(PersistenceError::Corrupt("store.json".to_string())),
            Error::Logging(LogError::InvalidLevel("loud".to_string())),
            Error::Io(std::io::Error::other("disk")),
            Error::Json(json_err),
        ];

        for err in errors {
            let remediation = err.remediation().expect("remediation");
            assert!(!remediation.summary.is_empty(), "{err}");
        }
    }

    #[test]
    fn already_initialized_logging_has_no_remediation() {
        let err = Error::Logging(LogError::AlreadyInitialized);
        assert!(err.remediation().is_none());
    }

    #[test]
    fn format_includes_remediation_block() {
        let err = Error::Config(ConfigError::FileNotFound("/tmp/missing.toml".to_string()));
        let text = format_error_with_remediation(&err);
        assert!(text.starts_with("Error: Config error: Config file not found"));
        assert!(text.contains("To fix:"));
        assert!(text.contains("Alternatives:"));
    }

    #[test]
    fn host_error_display() {
        assert_eq!(HostError::PanelGone(PanelId(7)).to_string(), "panel #7 is gone");
        assert_eq!(
            HostError::Rejected("busy".to_string()).to_string(),
            "host rejected request: busy"
        );
    }

    #[test]
    fn io_error_converts() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
