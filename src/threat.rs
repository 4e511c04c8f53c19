//! Authentication-log threat detection.
//!
//! A [`ThreatDetector`] classifies log lines against a fixed, ordered set of
//! patterns and correlates failed logins over two sliding windows:
//!
//! - the correlation window (default 300s) holding [`SecurityEvent`]s and the
//!   per-IP failure timestamps behind the `brute_force` alert;
//! - the error-rate window (default 60s) behind the `high_error_rate` alert.
//!
//! The windows are pruned independently. Both keep entries strictly younger
//! than `now - window`.

use crate::logtail::LogBatch;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Top-N cut for IP and user rankings.
pub const TOP_N: usize = 10;

/// Hits needed before a ranked IP counts as suspicious.
pub const SUSPICIOUS_MIN_HITS: u64 = 3;

/// Detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatThresholds {
    /// Failures from one IP inside the correlation window that raise `brute_force`.
    pub failed_login_threshold: usize,
    /// Correlation window.
    pub failed_login_window: Duration,
    /// Failures inside the error-rate window that raise `high_error_rate`.
    pub error_rate_threshold: usize,
    /// Error-rate window.
    pub error_rate_window: Duration,
}

impl Default for ThreatThresholds {
    fn default() -> Self {
        Self {
            failed_login_threshold: 20,
            failed_login_window: Duration::from_secs(300),
            error_rate_threshold: 10,
            error_rate_window: Duration::from_secs(60),
        }
    }
}

/// Kind of a correlated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    /// Invalid user or failed password.
    FailedLogin,
    /// Accepted password or key.
    SuccessfulLogin,
}

/// One correlated authentication event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEvent {
    /// Pass time at which the line was first seen.
    pub at: Instant,
    /// Event kind.
    pub kind: SecurityEventKind,
    /// Login name.
    pub user: String,
    /// Remote address.
    pub ip: String,
}

/// Classification of a single log line. The first matching category wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// `Invalid user NAME from IP`.
    InvalidUser {
        /// Login name.
        user: String,
        /// Remote address.
        ip: String,
    },
    /// `Failed password for [invalid user ]NAME from IP`.
    FailedPassword {
        /// Login name.
        user: String,
        /// Remote address.
        ip: String,
    },
    /// `Connection closed by invalid user`.
    ConnectionClosedInvalid,
    /// `Accepted password|publickey for NAME from IP`.
    Accepted {
        /// Login name.
        user: String,
        /// Remote address.
        ip: String,
    },
}

impl LineClass {
    /// `error_types` label, `None` for successful logins.
    pub fn error_label(&self) -> Option<&'static str> {
        match self {
            Self::InvalidUser { .. } => Some("Invalid user attempt"),
            Self::FailedPassword { .. } => Some("Failed password"),
            Self::ConnectionClosedInvalid => Some("Connection closed (invalid user)"),
            Self::Accepted { .. } => None,
        }
    }

    /// `(user, ip)` of a failed login.
    pub fn failure(&self) -> Option<(&str, &str)> {
        match self {
            Self::InvalidUser { user, ip } | Self::FailedPassword { user, ip } => Some((user, ip)),
            _ => None,
        }
    }
}

/// Kind of a detector alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatKind {
    /// Many failures from one address.
    BruteForce,
    /// Many failures overall in a short window.
    HighErrorRate,
}

impl ThreatKind {
    /// Snake-case identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::BruteForce => "brute_force",
            Self::HighErrorRate => "high_error_rate",
        }
    }

    /// Whether the alert is rendered as danger rather than warning.
    pub fn is_danger(self) -> bool {
        matches!(self, Self::BruteForce)
    }
}

/// An alert raised by one detector pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatAlert {
    /// Alert kind.
    pub kind: ThreatKind,
    /// Human-readable message.
    pub message: String,
    /// Offending address for `brute_force`.
    pub ip: Option<String>,
    /// Failures counted.
    pub count: usize,
}

/// Result of one detector pass over a log tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityStats {
    /// A security log produced output.
    pub available: bool,
    /// Every candidate log was refused for lack of permission.
    pub permission_denied: bool,
    /// Non-blank lines examined.
    pub total_parsed: usize,
    /// Invalid-user and failed-password lines.
    pub failed_logins: u64,
    /// Accepted lines.
    pub successful_logins: u64,
    /// `failed / (failed + successful)`, 0 when both are 0.
    pub failed_ratio: f64,
    /// Most active addresses, descending, ties in first-seen order.
    pub top_ips: Vec<(String, u64)>,
    /// Most targeted logins among failures, same ordering.
    pub top_users: Vec<(String, u64)>,
    /// Counts per error label, in first-seen order.
    pub error_types: Vec<(String, u64)>,
    /// Alerts raised by this pass.
    pub alerts: Vec<ThreatAlert>,
    /// Ranked addresses with at least [`SUSPICIOUS_MIN_HITS`] hits.
    pub suspicious_ips: Vec<(String, u64)>,
}

/// `failed / (failed + successful)`, 0 when nothing was seen.
pub fn failed_ratio(failed: u64, successful: u64) -> f64 {
    let total = failed + successful;
    if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    }
}

/// Insertion-ordered counter.
#[derive(Debug, Default)]
struct Tally {
    counts: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn bump(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.counts.len());
                self.counts.push((key.to_string(), 1));
            }
        }
    }

    /// Descending by count; the stable sort keeps first-seen order on ties.
    fn top(mut self, n: usize) -> Vec<(String, u64)> {
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.truncate(n);
        self.counts
    }

    fn into_inner(self) -> Vec<(String, u64)> {
        self.counts
    }
}

#[derive(Debug)]
struct Patterns {
    invalid_user: Regex,
    failed_password: Regex,
    connection_closed: Regex,
    accepted: Regex,
}

impl Patterns {
    fn compile() -> Self {
        Self {
            invalid_user: compile(r"Invalid user (\S+) from ([\d.]+)"),
            failed_password: compile(r"Failed password for (?:invalid user )?(\S+) from ([\d.]+)"),
            connection_closed: compile(r"Connection closed by invalid user"),
            accepted: compile(r"Accepted (?:password|publickey) for (\S+) from ([\d.]+)"),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

fn user_ip(re: &Regex, line: &str) -> Option<(String, String)> {
    let caps = re.captures(line)?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}

/// Keeps timestamps strictly younger than `now - window`.
fn retain_recent(times: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    if let Some(cutoff) = now.checked_sub(window) {
        times.retain(|t| *t > cutoff);
    }
}

/// Sliding-window log classifier and correlator.
#[derive(Debug)]
pub struct ThreatDetector {
    patterns: Patterns,
    thresholds: ThreatThresholds,
    events: Vec<SecurityEvent>,
    ip_failures: HashMap<String, VecDeque<Instant>>,
    recent_failures: VecDeque<Instant>,
}

impl Default for ThreatDetector {
    fn default() -> Self {
        Self::new(ThreatThresholds::default())
    }
}

impl ThreatDetector {
    /// Compiles the patterns and starts with empty windows.
    pub fn new(thresholds: ThreatThresholds) -> Self {
        Self {
            patterns: Patterns::compile(),
            thresholds,
            events: Vec::new(),
            ip_failures: HashMap::new(),
            recent_failures: VecDeque::new(),
        }
    }

    /// Active thresholds.
    pub fn thresholds(&self) -> ThreatThresholds {
        self.thresholds
    }

    /// Classifies one line by searching anywhere in it.
    pub fn classify(&self, line: &str) -> Option<LineClass> {
        let p = &self.patterns;
        if let Some((user, ip)) = user_ip(&p.invalid_user, line) {
            return Some(LineClass::InvalidUser { user, ip });
        }
        if let Some((user, ip)) = user_ip(&p.failed_password, line) {
            return Some(LineClass::FailedPassword { user, ip });
        }
        if p.connection_closed.is_match(line) {
            return Some(LineClass::ConnectionClosedInvalid);
        }
        user_ip(&p.accepted, line).map(|(user, ip)| LineClass::Accepted { user, ip })
    }

    /// Drops window entries at or before `now - window`; empty IP windows are removed.
    pub fn prune(&mut self, now: Instant) {
        let window = self.thresholds.failed_login_window;
        if let Some(cutoff) = now.checked_sub(window) {
            self.events.retain(|e| e.at > cutoff);
        }
        for times in self.ip_failures.values_mut() {
            retain_recent(times, now, window);
        }
        self.ip_failures.retain(|_, times| !times.is_empty());
        retain_recent(&mut self.recent_failures, now, self.thresholds.error_rate_window);
    }

    /// Records a classified line seen at `at` into the windows.
    pub fn record(&mut self, class: &LineClass, at: Instant) {
        match class {
            LineClass::InvalidUser { user, ip } | LineClass::FailedPassword { user, ip } => {
                self.events.push(SecurityEvent {
                    at,
                    kind: SecurityEventKind::FailedLogin,
                    user: user.clone(),
                    ip: ip.clone(),
                });
                self.ip_failures.entry(ip.clone()).or_default().push_back(at);
                self.recent_failures.push_back(at);
            }
            LineClass::Accepted { user, ip } => {
                self.events.push(SecurityEvent {
                    at,
                    kind: SecurityEventKind::SuccessfulLogin,
                    user: user.clone(),
                    ip: ip.clone(),
                });
            }
            LineClass::ConnectionClosedInvalid => {}
        }
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> &[SecurityEvent] {
        &self.events
    }

    /// Failures currently held for `ip`.
    pub fn failures_from(&self, ip: &str) -> usize {
        self.ip_failures.get(ip).map_or(0, VecDeque::len)
    }

    /// Failures currently inside the error-rate window.
    pub fn recent_failure_count(&self) -> usize {
        self.recent_failures.len()
    }

    /// Alerts for the current window contents; brute-force alerts are ordered by address.
    pub fn alerts(&self) -> Vec<ThreatAlert> {
        let mut offenders: Vec<(&String, usize)> = self
            .ip_failures
            .iter()
            .map(|(ip, times)| (ip, times.len()))
            .filter(|(_, n)| *n >= self.thresholds.failed_login_threshold)
            .collect();
        offenders.sort();

        let mut alerts: Vec<ThreatAlert> = offenders
            .into_iter()
            .map(|(ip, count)| ThreatAlert {
                kind: ThreatKind::BruteForce,
                message: format!("Possible brute force from {ip} ({count} attempts)"),
                ip: Some(ip.clone()),
                count,
            })
            .collect();

        let recent = self.recent_failures.len();
        if recent >= self.thresholds.error_rate_threshold {
            alerts.push(ThreatAlert {
                kind: ThreatKind::HighErrorRate,
                message: format!("{recent} failed logins in {}", window_label(self.thresholds.error_rate_window)),
                ip: None,
                count: recent,
            });
        }
        alerts
    }

    /// One pass: prune, compute statistics over the whole batch, feed only
    /// fresh lines into the windows, then evaluate alerts.
    pub fn analyze(&mut self, now: Instant, batch: &LogBatch) -> SecurityStats {
        self.prune(now);

        let mut stats = SecurityStats { available: true, ..SecurityStats::default() };
        let mut ips = Tally::default();
        let mut users = Tally::default();
        let mut errors = Tally::default();

        for (index, line) in batch.lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            stats.total_parsed += 1;
            let Some(class) = self.classify(line) else {
                continue;
            };
            if let Some(label) = class.error_label() {
                errors.bump(label);
            }
            match &class {
                LineClass::InvalidUser { user, ip } | LineClass::FailedPassword { user, ip } => {
                    stats.failed_logins += 1;
                    ips.bump(ip);
                    users.bump(user);
                }
                LineClass::Accepted { ip, .. } => {
                    stats.successful_logins += 1;
                    ips.bump(ip);
                }
                LineClass::ConnectionClosedInvalid => {}
            }
            if index >= batch.fresh_from {
                self.record(&class, now);
            }
        }

        stats.failed_ratio = failed_ratio(stats.failed_logins, stats.successful_logins);
        stats.top_ips = ips.top(TOP_N);
        stats.top_users = users.top(TOP_N);
        stats.error_types = errors.into_inner();
        stats.suspicious_ips = stats.top_ips.iter().filter(|(_, n)| *n >= SUSPICIOUS_MIN_HITS).cloned().collect();
        stats.alerts = self.alerts();
        crate::trace!(
            "threat",
            "pass: {} lines, {} failed, {} alerts",
            stats.total_parsed,
            stats.failed_logins,
            stats.alerts.len()
        );
        stats
    }
}

fn window_label(window: Duration) -> String {
    let secs = window.as_secs();
    if secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BOB: &str = "Oct 16 10:00:00 host sshd[99]: Failed password for invalid user bob from 10.0.0.5 port 4242 ssh2";

    fn batch(lines: &[&str]) -> LogBatch {
        LogBatch { lines: lines.iter().map(|l| (*l).to_string()).collect(), fresh_from: 0 }
    }

    fn failure(ip: &str) -> LineClass {
        LineClass::FailedPassword { user: "root".to_string(), ip: ip.to_string() }
    }

    #[test]
    fn test_classify_searches_within_line() {
        let d = ThreatDetector::default();
        assert_eq!(
            d.classify("sshd[1]: Invalid user admin from 192.0.2.1 port 22"),
            Some(LineClass::InvalidUser { user: "admin".into(), ip: "192.0.2.1".into() })
        );
        assert_eq!(d.classify(BOB), Some(LineClass::FailedPassword { user: "bob".into(), ip: "10.0.0.5".into() }));
        assert_eq!(
            d.classify("sshd[1]: Connection closed by invalid user test 192.0.2.9 port 1 [preauth]"),
            Some(LineClass::ConnectionClosedInvalid)
        );
        assert_eq!(
            d.classify("sshd[1]: Accepted publickey for alice from 198.51.100.4 port 5 ssh2"),
            Some(LineClass::Accepted { user: "alice".into(), ip: "198.51.100.4".into() })
        );
        assert_eq!(d.classify("CRON[5]: session opened for user root"), None);
    }

    #[test]
    fn test_twenty_failures_scenario() {
        let mut d = ThreatDetector::default();
        let lines = vec![BOB; 20];
        let stats = d.analyze(Instant::now(), &batch(&lines));

        assert_eq!(stats.failed_logins, 20);
        assert_eq!(stats.top_ips, vec![("10.0.0.5".to_string(), 20)]);
        assert_eq!(stats.top_users, vec![("bob".to_string(), 20)]);
        assert_eq!(stats.failed_ratio, 1.0);
        let brute: Vec<&ThreatAlert> = stats.alerts.iter().filter(|a| a.kind == ThreatKind::BruteForce).collect();
        assert_eq!(brute.len(), 1);
        assert_eq!(brute[0].ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(brute[0].count, 20);
        assert_eq!(brute[0].message, "Possible brute force from 10.0.0.5 (20 attempts)");
    }

    #[test]
    fn test_nineteen_failures_do_not_trigger() {
        let mut d = ThreatDetector::default();
        let base = Instant::now();
        for i in 0..19 {
            d.record(&failure("10.0.0.9"), base + Duration::from_secs(i));
        }
        assert!(d.alerts().iter().all(|a| a.kind != ThreatKind::BruteForce));

        d.record(&failure("10.0.0.9"), base + Duration::from_secs(19));
        let brute: Vec<ThreatAlert> = d.alerts().into_iter().filter(|a| a.kind == ThreatKind::BruteForce).collect();
        assert_eq!(brute.len(), 1);
        assert_eq!(brute[0].count, 20);
    }

    #[test]
    fn test_pruning_boundary_is_exclusive() {
        let base = Instant::now();
        let window = ThreatThresholds::default().failed_login_window;

        let mut d = ThreatDetector::default();
        d.record(&failure("10.0.0.1"), base);
        d.prune(base + window);
        assert_eq!(d.failures_from("10.0.0.1"), 0, "event at exactly now - window is dropped");
        assert!(d.events().is_empty());

        let mut d = ThreatDetector::default();
        d.record(&failure("10.0.0.1"), base);
        d.prune(base + window - Duration::from_secs(1));
        assert_eq!(d.failures_from("10.0.0.1"), 1, "event at now - window + 1s is kept");
        assert_eq!(d.events().len(), 1);
    }

    #[test]
    fn test_accepted_login_is_an_event_not_a_failure() {
        let mut d = ThreatDetector::default();
        let now = Instant::now();
        d.record(&LineClass::Accepted { user: "alice".into(), ip: "198.51.100.4".into() }, now);

        assert_eq!(d.events().len(), 1);
        assert_eq!(d.events()[0].kind, SecurityEventKind::SuccessfulLogin);
        assert_eq!(d.failures_from("198.51.100.4"), 0);
        assert_eq!(d.recent_failure_count(), 0);
    }

    #[test]
    fn test_windows_prune_independently() {
        let mut d = ThreatDetector::default();
        let base = Instant::now();
        for _ in 0..10 {
            d.record(&failure("10.0.0.2"), base);
        }
        assert!(d.alerts().iter().any(|a| a.kind == ThreatKind::HighErrorRate));

        d.prune(base + Duration::from_secs(61));
        assert_eq!(d.recent_failure_count(), 0);
        assert_eq!(d.failures_from("10.0.0.2"), 10);
        assert!(d.alerts().is_empty());
    }

    #[test]
    fn test_high_error_rate_message() {
        let mut d = ThreatDetector::default();
        let now = Instant::now();
        for i in 0..12 {
            d.record(&failure(&format!("10.1.0.{i}")), now);
        }
        let alerts = d.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, ThreatKind::HighErrorRate);
        assert_eq!(alerts[0].message, "12 failed logins in 1 min");
        assert!(!alerts[0].kind.is_danger());
    }

    #[test]
    fn test_only_fresh_lines_enter_windows() {
        let mut d = ThreatDetector::default();
        let now = Instant::now();
        let mut b = batch(&[BOB, BOB, BOB]);
        b.fresh_from = 2;

        let stats = d.analyze(now, &b);
        assert_eq!(stats.failed_logins, 3, "statistics cover the whole tail");
        assert_eq!(d.failures_from("10.0.0.5"), 1, "windows see only fresh lines");
    }

    #[test]
    fn test_rankings_and_error_types() {
        let mut d = ThreatDetector::default();
        let lines = [
            "Invalid user guest from 203.0.113.1 port 1",
            "Failed password for root from 203.0.113.2 port 2 ssh2",
            "Failed password for root from 203.0.113.2 port 2 ssh2",
            "Accepted password for alice from 203.0.113.1 port 3 ssh2",
            "Connection closed by invalid user guest 203.0.113.1 port 1 [preauth]",
            "Failed password for admin from 203.0.113.3 port 4 ssh2",
            "",
        ];
        let stats = d.analyze(Instant::now(), &batch(&lines));

        assert_eq!(stats.total_parsed, 6);
        assert_eq!(stats.failed_logins, 4);
        assert_eq!(stats.successful_logins, 1);
        assert_eq!(
            stats.top_ips,
            vec![("203.0.113.1".to_string(), 2), ("203.0.113.2".to_string(), 2), ("203.0.113.3".to_string(), 1)]
        );
        assert_eq!(
            stats.top_users,
            vec![("root".to_string(), 2), ("guest".to_string(), 1), ("admin".to_string(), 1)]
        );
        assert_eq!(
            stats.error_types,
            vec![
                ("Invalid user attempt".to_string(), 1),
                ("Failed password".to_string(), 3),
                ("Connection closed (invalid user)".to_string(), 1),
            ]
        );
        assert!(stats.suspicious_ips.is_empty());
        assert!((stats.failed_ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_top_lists_truncate() {
        let mut d = ThreatDetector::default();
        let lines: Vec<String> = (0..15).map(|i| format!("Failed password for u{i} from 10.9.0.{i} port 1")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let stats = d.analyze(Instant::now(), &batch(&refs));
        assert_eq!(stats.top_ips.len(), TOP_N);
        assert_eq!(stats.top_ips[0].0, "10.9.0.0");
    }

    #[test]
    fn test_failed_ratio_edges() {
        assert_eq!(failed_ratio(0, 0), 0.0);
        assert_eq!(failed_ratio(5, 0), 1.0);
        assert_eq!(failed_ratio(1, 3), 0.25);
    }

    proptest! {
        #[test]
        fn prop_failed_ratio_in_unit_range(failed in 0u64..1_000_000, ok in 0u64..1_000_000) {
            let r = failed_ratio(failed, ok);
            prop_assert!((0.0..=1.0).contains(&r));
        }
    }
}
