//! Error types for the telemetry engine.
//!
//! Every source operation returns an explicit [`Result`]. The source cache is
//! the only place that turns a failure into a sentinel value; everything else
//! propagates with `?`.

use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for monitoring operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A pseudo-file, device or external tool is absent.
    #[error("source '{collector}' is unavailable: {reason}")]
    Unavailable {
        /// The source that could not be read.
        collector: &'static str,
        /// What was missing.
        reason: String,
    },

    /// An external tool did not finish within its bound.
    #[error("command '{command}' timed out after {after:?}")]
    Timeout {
        /// Program name.
        command: String,
        /// The bound that was exceeded.
        after: Duration,
    },

    /// Malformed counter or log data.
    #[error("failed to parse {collector} data: {message}")]
    Parse {
        /// The source whose data was malformed.
        collector: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Permission denied for a privileged read or command.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// Terminal initialization or rendering error.
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Coarse classification of a [`MonitorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Absent input, missing tool, or timeout. The source reports its sentinel.
    TransientUnavailable,
    /// Malformed data. The affected unit is skipped.
    Parse,
    /// Privileged operation refused. Surfaced as a flag, never fatal.
    PermissionDenied,
    /// Configuration could not be loaded or was invalid.
    Config,
    /// The rendering surface failed.
    Terminal,
}

impl MonitorError {
    /// Shorthand for [`MonitorError::Unavailable`].
    pub fn unavailable(collector: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable { collector, reason: reason.into() }
    }

    /// Shorthand for [`MonitorError::Parse`].
    pub fn parse(collector: &'static str, message: impl Into<String>) -> Self {
        Self::Parse { collector, message: message.into() }
    }

    /// Maps an I/O failure on `path` to the matching error kind.
    pub fn from_io(collector: &'static str, path: &Path, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.display().to_string()),
            io::ErrorKind::NotFound => Self::unavailable(collector, format!("{} not found", path.display())),
            _ => Self::unavailable(collector, format!("{}: {err}", path.display())),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } | Self::Timeout { .. } => ErrorKind::TransientUnavailable,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::ConfigParse { .. } | Self::ConfigNotFound(_) | Self::ConfigInvalid { .. } => ErrorKind::Config,
            Self::Terminal(_) => ErrorKind::Terminal,
        }
    }
}

/// Result type alias for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_error_includes_line_number() {
        let err = MonitorError::ConfigParse { line: 42, message: "invalid value".to_string() };
        let display = err.to_string();

        assert!(display.contains("42"), "Error should include line number: {display}");
        assert!(display.contains("invalid value"), "Error should include message: {display}");
    }

    #[test]
    fn test_unavailable_includes_source_and_reason() {
        let err = MonitorError::unavailable("battery", "/sys/class/power_supply/BAT0 not found");
        let display = err.to_string();

        assert!(display.contains("battery"), "Error should include source: {display}");
        assert!(display.contains("BAT0"), "Error should include reason: {display}");
        assert_eq!(err.kind(), ErrorKind::TransientUnavailable);
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = MonitorError::Timeout { command: "kubectl".to_string(), after: Duration::from_secs(3) };

        assert!(err.to_string().contains("kubectl"));
        assert_eq!(err.kind(), ErrorKind::TransientUnavailable);
    }

    #[test]
    fn test_parse_error_kind() {
        let err = MonitorError::parse("cpu", "expected 8 fields");
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("expected 8 fields"));
    }

    #[test]
    fn test_from_io_not_found_is_unavailable() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = MonitorError::from_io("memory", Path::new("/proc/meminfo"), &io_err);

        assert_eq!(err.kind(), ErrorKind::TransientUnavailable);
        assert!(err.to_string().contains("/proc/meminfo"));
    }

    #[test]
    fn test_from_io_permission_denied() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err = MonitorError::from_io("security", Path::new("/var/log/auth.log"), &io_err);

        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(matches!(err, MonitorError::PermissionDenied(ref p) if p == "/var/log/auth.log"));
    }

    #[test]
    fn test_config_kinds() {
        assert_eq!(MonitorError::ConfigNotFound("x".into()).kind(), ErrorKind::Config);
        let invalid = MonitorError::ConfigInvalid { key: "refresh_rate".into(), message: "too big".into() };
        assert_eq!(invalid.kind(), ErrorKind::Config);
        assert!(invalid.to_string().contains("refresh_rate"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: MonitorError = io_err.into();

        assert!(matches!(err, MonitorError::Terminal(_)), "Should convert to Terminal");
        assert_eq!(err.kind(), ErrorKind::Terminal);
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MonitorError>();
    }
}
