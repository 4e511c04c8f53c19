//! Headless service mode (for systemd).
//!
//! Ticks the engine every refresh period, prints one summary line per tick and
//! appends it to the configured log file until SIGINT or SIGTERM.

use crate::alerts::evaluate;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{MonitorError, Result};
use crate::summary::format_summary;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timestamp format of summary lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SLEEP_STEP: Duration = Duration::from_millis(100);

/// Appends one line to `path`.
pub fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

/// Runs one service tick and returns the summary line written.
pub fn service_tick(engine: &mut Engine, now: Instant, timestamp: &str) -> String {
    let snapshot = engine.tick(now);
    let alerts = evaluate(&snapshot, &engine.config().alerts);
    let line = format_summary(timestamp, &snapshot, &alerts);

    if let Err(err) = append_line(&engine.config().log_file, &line) {
        crate::debug!("service", "{}: {err}", engine.config().log_file.display());
    }
    line
}

/// Runs the headless loop until interrupted.
///
/// # Errors
///
/// Returns an error if the signal handler cannot be installed.
pub fn run_service(config: Config) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| MonitorError::unavailable("service", e.to_string()))?;

    println!("Sentinel v{} - Service Mode", env!("CARGO_PKG_VERSION"));
    println!("Logging to: {}", config.log_file.display());
    println!("Refresh interval: {}s", config.refresh_rate);
    println!("{}", "-".repeat(40));

    let mut engine = Engine::new(config);
    while running.load(Ordering::SeqCst) {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        println!("{}", service_tick(&mut engine, Instant::now(), &timestamp));

        let deadline = Instant::now() + engine.refresh_interval();
        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(SLEEP_STEP);
        }
    }

    crate::info!("service", "stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::HostPaths;

    #[test]
    fn test_service_tick_appends_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.integrations.docker = false;
        config.integrations.kubernetes = false;
        config.public_ip_check = false;
        config.show_vpn = false;
        config.proxy_logs.clear();
        config.security_logs.clear();
        config.log_file = dir.path().join("sentinel.log");
        let log_file = config.log_file.clone();

        let mut engine = Engine::with_paths(config, HostPaths::under(dir.path()));
        let first = service_tick(&mut engine, Instant::now(), "2025-01-01 00:00:00");
        let second = service_tick(&mut engine, Instant::now(), "2025-01-01 00:00:02");

        assert!(first.starts_with("2025-01-01 00:00:00 | CPU:"));
        assert!(first.ends_with("ALERTS: OK"));
        let logged = std::fs::read_to_string(log_file).unwrap();
        assert_eq!(logged, format!("{first}\n{second}\n"));
    }

    #[test]
    fn test_unwritable_log_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.integrations.docker = false;
        config.integrations.kubernetes = false;
        config.public_ip_check = false;
        config.show_vpn = false;
        config.log_file = dir.path().join("missing").join("sentinel.log");

        let mut engine = Engine::with_paths(config, HostPaths::under(dir.path()));
        let line = service_tick(&mut engine, Instant::now(), "ts");
        assert!(line.starts_with("ts | CPU:"));
    }
}
