//! Configuration system.
//!
//! YAML file with serde defaults for every key. Lookup order when no explicit
//! path is given: `<config_dir>/sentinel/config.yaml`, `~/.sentinel.yaml`,
//! `/etc/sentinel/config.yaml`.

use crate::error::{MonitorError, Result};
use crate::layout::LayoutMode;
use crate::threat::ThreatThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Valid refresh rates in seconds.
pub const REFRESH_RANGE: std::ops::RangeInclusive<u64> = 1..=10;

/// Alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// CPU % for `CPU HIGH`.
    #[serde(default = "default_cpu_high")]
    pub cpu_high: f64,
    /// CPU % for `CPU CRITICAL`.
    #[serde(default = "default_cpu_critical")]
    pub cpu_critical: f64,
    /// Memory % for `MEM HIGH`.
    #[serde(default = "default_mem_high")]
    pub mem_high: f64,
    /// Memory % for `MEM CRITICAL`.
    #[serde(default = "default_mem_critical")]
    pub mem_critical: f64,
    /// °C for `TEMP HIGH`.
    #[serde(default = "default_temp_high")]
    pub temp_high: f64,
    /// °C for `TEMP CRITICAL`.
    #[serde(default = "default_temp_critical")]
    pub temp_critical: f64,
    /// Battery % for `BATTERY LOW`.
    #[serde(default = "default_battery_low")]
    pub battery_low: u8,
    /// Battery % for `BATTERY CRITICAL`.
    #[serde(default = "default_battery_critical")]
    pub battery_critical: u8,
}

fn default_cpu_high() -> f64 {
    85.0
}
fn default_cpu_critical() -> f64 {
    95.0
}
fn default_mem_high() -> f64 {
    80.0
}
fn default_mem_critical() -> f64 {
    95.0
}
fn default_temp_high() -> f64 {
    75.0
}
fn default_temp_critical() -> f64 {
    90.0
}
fn default_battery_low() -> u8 {
    20
}
fn default_battery_critical() -> u8 {
    10
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_high: default_cpu_high(),
            cpu_critical: default_cpu_critical(),
            mem_high: default_mem_high(),
            mem_critical: default_mem_critical(),
            temp_high: default_temp_high(),
            temp_critical: default_temp_critical(),
            battery_low: default_battery_low(),
            battery_critical: default_battery_critical(),
        }
    }
}

/// Threat detector settings (windows in seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAlertConfig {
    /// Failures from one address that raise `brute_force`.
    #[serde(default = "default_failed_login_threshold")]
    pub failed_login_threshold: usize,
    /// Correlation window.
    #[serde(default = "default_failed_login_window")]
    pub failed_login_window: u64,
    /// Failures that raise `high_error_rate`.
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: usize,
    /// Error-rate window.
    #[serde(default = "default_error_rate_window")]
    pub error_rate_window: u64,
}

fn default_failed_login_threshold() -> usize {
    20
}
fn default_failed_login_window() -> u64 {
    300
}
fn default_error_rate_threshold() -> usize {
    10
}
fn default_error_rate_window() -> u64 {
    60
}

impl Default for SecurityAlertConfig {
    fn default() -> Self {
        Self {
            failed_login_threshold: default_failed_login_threshold(),
            failed_login_window: default_failed_login_window(),
            error_rate_threshold: default_error_rate_threshold(),
            error_rate_window: default_error_rate_window(),
        }
    }
}

impl From<SecurityAlertConfig> for ThreatThresholds {
    fn from(c: SecurityAlertConfig) -> Self {
        Self {
            failed_login_threshold: c.failed_login_threshold,
            failed_login_window: Duration::from_secs(c.failed_login_window),
            error_rate_threshold: c.error_rate_threshold,
            error_rate_window: Duration::from_secs(c.error_rate_window),
        }
    }
}

/// External-tool integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrations {
    /// Query the container runtime.
    #[serde(default = "default_true")]
    pub docker: bool,
    /// Query the cluster.
    #[serde(default = "default_true")]
    pub kubernetes: bool,
}

impl Default for Integrations {
    fn default() -> Self {
        Self { docker: true, kubernetes: true }
    }
}

/// Refresh intervals of the slower sources, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervals {
    /// Cluster state.
    #[serde(default = "default_kubernetes_interval")]
    pub kubernetes: u64,
    /// Per-container stats sample.
    #[serde(default = "default_docker_stats_interval")]
    pub docker_stats: u64,
    /// Access-log statistics.
    #[serde(default = "default_five")]
    pub proxy: u64,
    /// Threat detector pass.
    #[serde(default = "default_five")]
    pub security: u64,
    /// Public address lookup.
    #[serde(default = "default_public_ip_interval")]
    pub public_ip: u64,
    /// Release check.
    #[serde(default = "default_update_check_interval")]
    pub update_check: u64,
    /// Top-process sample.
    #[serde(default = "default_five")]
    pub process_top: u64,
}

fn default_kubernetes_interval() -> u64 {
    5
}
fn default_docker_stats_interval() -> u64 {
    10
}
fn default_five() -> u64 {
    5
}
fn default_public_ip_interval() -> u64 {
    30
}
fn default_update_check_interval() -> u64 {
    86_400
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            kubernetes: default_kubernetes_interval(),
            docker_stats: default_docker_stats_interval(),
            proxy: default_five(),
            security: default_five(),
            public_ip: default_public_ip_interval(),
            update_check: default_update_check_interval(),
            process_top: default_five(),
        }
    }
}

/// A named log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    /// Short label (`nginx`, `auth`, ...).
    pub name: String,
    /// File to tail.
    pub path: PathBuf,
}

impl LogSource {
    fn new(name: &str, path: &str) -> Self {
        Self { name: name.to_string(), path: PathBuf::from(path) }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Color theme name.
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Layout mode name.
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Tick period in seconds.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u64,

    /// Show per-core bars.
    #[serde(default = "default_true")]
    pub show_per_core: bool,

    /// Query WireGuard peers.
    #[serde(default = "default_true")]
    pub show_vpn: bool,

    /// Look up the public address.
    #[serde(default = "default_true")]
    pub public_ip_check: bool,

    /// Summary log of the headless mode.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Published version file; no release check when unset.
    #[serde(default)]
    pub update_check_url: Option<String>,

    /// Alert thresholds.
    #[serde(default)]
    pub alerts: AlertThresholds,

    /// Access logs, highest priority first.
    #[serde(default = "default_proxy_logs")]
    pub proxy_logs: Vec<LogSource>,

    /// Authentication logs, highest priority first.
    #[serde(default = "default_security_logs")]
    pub security_logs: Vec<LogSource>,

    /// Threat detector settings.
    #[serde(default)]
    pub security_alerts: SecurityAlertConfig,

    /// External-tool integrations.
    #[serde(default)]
    pub integrations: Integrations,

    /// Source refresh intervals.
    #[serde(default)]
    pub intervals: Intervals,
}

fn default_theme() -> String {
    "default".to_string()
}
fn default_layout() -> String {
    "default".to_string()
}
fn default_refresh_rate() -> u64 {
    2
}
fn default_true() -> bool {
    true
}
fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/sentinel.log")
}
fn default_proxy_logs() -> Vec<LogSource> {
    vec![LogSource::new("nginx", "/var/log/nginx/access.log"), LogSource::new("caddy", "/var/log/caddy/access.log")]
}
fn default_security_logs() -> Vec<LogSource> {
    vec![
        LogSource::new("auth", "/var/log/auth.log"),
        LogSource::new("secure", "/var/log/secure"),
        LogSource::new("syslog", "/var/log/syslog"),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            layout: default_layout(),
            refresh_rate: default_refresh_rate(),
            show_per_core: true,
            show_vpn: true,
            public_ip_check: true,
            log_file: default_log_file(),
            update_check_url: None,
            alerts: AlertThresholds::default(),
            proxy_logs: default_proxy_logs(),
            security_logs: default_security_logs(),
            security_alerts: SecurityAlertConfig::default(),
            integrations: Integrations::default(),
            intervals: Intervals::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| MonitorError::ConfigNotFound(path.display().to_string()))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            MonitorError::ConfigParse { line, message: e.to_string() }
        })
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                crate::warn!("config", "{err}; using defaults");
                Self::default()
            }
        }
    }

    /// Candidate file locations, highest priority first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sentinel").join("config.yaml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".sentinel.yaml"));
        }
        paths.push(PathBuf::from("/etc/sentinel/config.yaml"));
        paths
    }

    /// First existing file among [`Config::search_paths`].
    pub fn discover() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|p| p.is_file())
    }

    /// Loads `path`, or the discovered file, or defaults.
    #[must_use]
    pub fn resolve(path: Option<&Path>) -> Self {
        match path.map(Path::to_path_buf).or_else(Self::discover) {
            Some(path) => {
                crate::info!("config", "loading {}", path.display());
                Self::load_or_default(path)
            }
            None => Self::default(),
        }
    }

    /// Checks ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: String| Err(MonitorError::ConfigInvalid { key: key.to_string(), message });

        if !REFRESH_RANGE.contains(&self.refresh_rate) {
            return invalid("refresh_rate", format!("{} is outside 1..=10 seconds", self.refresh_rate));
        }
        if self.layout.parse::<LayoutMode>().is_err() {
            return invalid("layout", format!("unknown layout '{}'", self.layout));
        }
        let s = &self.security_alerts;
        if s.failed_login_window == 0 || s.error_rate_window == 0 {
            return invalid("security_alerts", "windows must be positive".to_string());
        }
        if s.failed_login_threshold == 0 || s.error_rate_threshold == 0 {
            return invalid("security_alerts", "thresholds must be positive".to_string());
        }
        Ok(())
    }

    /// Serializes to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| MonitorError::ConfigInvalid { key: "*".to_string(), message: e.to_string() })
    }

    /// Writes the defaults to the first search path, creating its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no location is known or the file cannot be written.
    pub fn init_default() -> Result<PathBuf> {
        let path = Self::search_paths()
            .into_iter()
            .next()
            .ok_or_else(|| MonitorError::ConfigNotFound("no configuration directory".to_string()))?;
        Self::default().write_to(&path)?;
        Ok(path)
    }

    /// Writes this configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Tick period.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_rate)
    }

    /// Parsed layout mode, default when unknown.
    #[must_use]
    pub fn layout_mode(&self) -> LayoutMode {
        self.layout.parse().unwrap_or_default()
    }

    /// `(name, path)` pairs of the access logs.
    pub fn proxy_log_paths(&self) -> Vec<(String, PathBuf)> {
        self.proxy_logs.iter().map(|l| (l.name.clone(), l.path.clone())).collect()
    }

    /// `(name, path)` pairs of the authentication logs.
    pub fn security_log_paths(&self) -> Vec<(String, PathBuf)> {
        self.security_logs.iter().map(|l| (l.name.clone(), l.path.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::new();

        assert_eq!(config.refresh_rate, 2);
        assert_eq!(config.theme, "default");
        assert_eq!(config.alerts.cpu_high, 85.0);
        assert_eq!(config.alerts.battery_critical, 10);
        assert_eq!(config.security_alerts.failed_login_threshold, 20);
        assert_eq!(config.intervals.public_ip, 30);
        assert_eq!(config.proxy_logs[0].name, "nginx");
        assert_eq!(config.security_logs.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(), ["auth", "secure", "syslog"]);
        assert!(config.update_check_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal() {
        let config = Config::parse("refresh_rate: 5").unwrap();
        assert_eq!(config.refresh_rate, 5);
        assert!(config.integrations.docker);
    }

    #[test]
    fn test_config_parse_full() {
        let yaml = r#"
theme: dracula
layout: security
refresh_rate: 1
show_vpn: false
alerts:
  cpu_high: 70
security_logs:
  - name: custom
    path: /tmp/auth.log
security_alerts:
  failed_login_threshold: 5
integrations:
  docker: false
intervals:
  public_ip: 120
"#;

        let config = Config::parse(yaml).unwrap();

        assert_eq!(config.theme, "dracula");
        assert_eq!(config.layout_mode(), LayoutMode::Security);
        assert!(!config.show_vpn);
        assert_eq!(config.alerts.cpu_high, 70.0);
        assert_eq!(config.alerts.cpu_critical, 95.0);
        assert_eq!(config.security_logs.len(), 1);
        assert_eq!(config.security_alerts.failed_login_threshold, 5);
        assert_eq!(config.security_alerts.failed_login_window, 300);
        assert!(!config.integrations.docker);
        assert!(config.integrations.kubernetes);
        assert_eq!(config.intervals.public_ip, 120);
        assert_eq!(config.intervals.docker_stats, 10);
    }

    #[test]
    fn test_config_parse_error_includes_line() {
        let yaml = "\ntheme: nord\nalerts:\n  cpu_high: not_a_number\n";
        let err = Config::parse(yaml).unwrap_err();
        assert!(matches!(err, MonitorError::ConfigParse { line: 4, .. }), "{err}");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = Config { refresh_rate: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(MonitorError::ConfigInvalid { ref key, .. }) if key == "refresh_rate"));

        let config = Config { layout: "sideways".into(), ..Config::default() };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security_alerts.error_rate_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip_of_defaults() {
        let yaml = Config::default().to_yaml().unwrap();
        assert_eq!(Config::parse(&yaml).unwrap(), Config::default());
    }

    #[test]
    fn test_load_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("config.yaml");
        std::fs::write(&good, "refresh_rate: 3\n").unwrap();
        assert_eq!(Config::load(&good).unwrap().refresh_rate, 3);

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "refresh_rate: 99\n").unwrap();
        assert!(Config::load(&bad).is_err());
        assert_eq!(Config::load_or_default(&bad), Config::default());

        assert!(matches!(Config::load(dir.path().join("missing.yaml")), Err(MonitorError::ConfigNotFound(_))));
    }

    #[test]
    fn test_write_to_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sentinel").join("config.yaml");
        Config::default().write_to(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_thresholds_conversion() {
        let t: ThreatThresholds = SecurityAlertConfig::default().into();
        assert_eq!(t, ThreatThresholds::default());
    }
}
