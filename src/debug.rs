//! Component-tagged debug logging.
//!
//! Enabled via `--debug` or `SENTINEL_DEBUG=1`. Lines go to stderr unless a
//! log file is installed, which the dashboard does so that output never lands
//! on the alternate screen.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Global debug mode flag.
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Start time stored as millis since UNIX epoch.
static START_TIME_MS: AtomicU64 = AtomicU64::new(0);

/// Optional file sink. `None` means stderr.
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Environment variable that enables debug mode.
pub const DEBUG_ENV: &str = "SENTINEL_DEBUG";

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Enables debug mode globally.
pub fn enable() {
    START_TIME_MS.store(now_ms(), Ordering::SeqCst);
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disables debug mode globally.
pub fn disable() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

/// Enables debug mode when `SENTINEL_DEBUG` is set to `1` or `true`.
pub fn enable_from_env() -> bool {
    let on = std::env::var(DEBUG_ENV).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if on {
        enable();
    }
    on
}

/// Returns true if debug mode is enabled.
#[inline]
pub fn is_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Redirects log output to `path` (appending).
pub fn log_to_file(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Ok(mut sink) = LOG_FILE.lock() {
        *sink = Some(file);
    }
    Ok(())
}

/// Routes log output back to stderr.
pub fn log_to_stderr() {
    if let Ok(mut sink) = LOG_FILE.lock() {
        *sink = None;
    }
}

fn elapsed_ms() -> u64 {
    let start = START_TIME_MS.load(Ordering::Relaxed);
    if start == 0 {
        return 0;
    }
    now_ms().saturating_sub(start)
}

/// Debug log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Tracing entry/exit of functions
    Trace,
    /// Debug information
    Debug,
    /// Informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn color_code(self) -> &'static str {
        match self {
            Level::Trace => "\x1b[90m",
            Level::Debug => "\x1b[36m",
            Level::Info => "\x1b[32m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
        }
    }
}

fn format_line(elapsed: u64, level: Level, component: &str, message: &str, color: bool) -> String {
    if color {
        format!("[+{elapsed:04}ms] {}[{:5}]\x1b[0m [{component}] {message}", level.color_code(), level.as_str())
    } else {
        format!("[+{elapsed:04}ms] [{:5}] [{component}] {message}", level.as_str())
    }
}

/// Logs a message if debug mode is enabled.
pub fn log(level: Level, component: &str, message: &str) {
    if !is_enabled() {
        return;
    }

    let elapsed = elapsed_ms();
    if let Ok(mut sink) = LOG_FILE.lock() {
        if let Some(file) = sink.as_mut() {
            let _ = writeln!(file, "{}", format_line(elapsed, level, component, message, false));
            return;
        }
    }
    let _ = writeln!(io::stderr(), "{}", format_line(elapsed, level, component, message, true));
}

/// Logs with format arguments.
#[macro_export]
macro_rules! debug_log {
    ($level:expr, $component:expr, $($arg:tt)*) => {
        if $crate::debug::is_enabled() {
            $crate::debug::log($level, $component, &format!($($arg)*));
        }
    };
}

/// Convenience macro for trace level.
#[macro_export]
macro_rules! trace {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Trace, $component, $($arg)*)
    };
}

/// Convenience macro for debug level.
#[macro_export]
macro_rules! debug {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Debug, $component, $($arg)*)
    };
}

/// Convenience macro for info level.
#[macro_export]
macro_rules! info {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Info, $component, $($arg)*)
    };
}

/// Convenience macro for warn level.
#[macro_export]
macro_rules! warn {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Warn, $component, $($arg)*)
    };
}

/// Convenience macro for error level.
#[macro_export]
macro_rules! error {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Error, $component, $($arg)*)
    };
}

/// RAII guard for timing a scope.
pub struct TimingGuard {
    component: &'static str,
    operation: String,
    start: Instant,
}

impl TimingGuard {
    /// Creates a new timing guard.
    pub fn new(component: &'static str, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        if is_enabled() {
            log(Level::Trace, component, &format!("-> {operation}"));
        }
        Self { component, operation, start: Instant::now() }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if is_enabled() {
            let elapsed = self.start.elapsed();
            log(
                Level::Trace,
                self.component,
                &format!("<- {} ({:.2}ms)", self.operation, elapsed.as_secs_f64() * 1000.0),
            );
        }
    }
}

/// Creates a timing guard for a scope.
#[macro_export]
macro_rules! time_scope {
    ($component:expr, $operation:expr) => {
        let _guard = $crate::debug::TimingGuard::new($component, $operation);
    };
}
