//! Alert evaluator.
//!
//! [`evaluate`] is a pure function of a [`Snapshot`] and the thresholds. Each
//! metric yields at most one alert with critical taking precedence over high;
//! integration and threat alerts follow in a fixed order. The list is not
//! truncated here.

use crate::config::AlertThresholds;
use crate::snapshot::Snapshot;
use std::fmt;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Needs attention.
    Warning,
    /// Needs action.
    Danger,
}

/// One alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Upper-case name, e.g. `CPU HIGH`.
    pub name: String,
    /// Formatted value, e.g. `97%`.
    pub value: String,
    /// Severity.
    pub severity: Severity,
}

impl Alert {
    fn new(name: impl Into<String>, value: impl Into<String>, severity: Severity) -> Self {
        Self { name: name.into(), value: value.into(), severity }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}

/// Upper-cases a snake-case identifier and joins its words with spaces.
pub fn display_name(kind: &str) -> String {
    kind.split('_').filter(|w| !w.is_empty()).map(str::to_uppercase).collect::<Vec<_>>().join(" ")
}

fn level_alert(metric: &str, value: f64, high: f64, critical: f64, formatted: String) -> Option<Alert> {
    if value >= critical {
        Some(Alert::new(format!("{metric} CRITICAL"), formatted, Severity::Danger))
    } else if value >= high {
        Some(Alert::new(format!("{metric} HIGH"), formatted, Severity::Warning))
    } else {
        None
    }
}

/// Every alert for `snapshot`, in display order.
pub fn evaluate(snapshot: &Snapshot, thresholds: &AlertThresholds) -> Vec<Alert> {
    let t = thresholds;
    let mut alerts = Vec::new();

    let cpu = snapshot.cpu.usage;
    alerts.extend(level_alert("CPU", cpu, t.cpu_high, t.cpu_critical, format!("{cpu:.0}%")));

    let temp = snapshot.cpu.temp;
    alerts.extend(level_alert("TEMP", temp, t.temp_high, t.temp_critical, format!("{temp:.0}°C")));

    let mem = snapshot.memory.percent;
    alerts.extend(level_alert("MEM", mem, t.mem_high, t.mem_critical, format!("{mem:.0}%")));

    let battery = &snapshot.battery;
    if battery.present && !battery.state.is_charging() {
        let level = battery.level;
        if level <= t.battery_critical {
            alerts.push(Alert::new("BATTERY CRITICAL", format!("{level}%"), Severity::Danger));
        } else if level <= t.battery_low {
            alerts.push(Alert::new("BATTERY LOW", format!("{level}%"), Severity::Warning));
        }
    }

    let containers = &snapshot.containers;
    if containers.available && containers.stopped > 0 {
        alerts.push(Alert::new("DOCKER STOPPED", containers.stopped.to_string(), Severity::Warning));
    }

    let k8s = &snapshot.kubernetes;
    if k8s.available {
        if k8s.pods_failed > 0 {
            alerts.push(Alert::new("K8S FAILED", format!("{} pods", k8s.pods_failed), Severity::Danger));
        } else if k8s.pods_pending > 0 {
            alerts.push(Alert::new("K8S PENDING", format!("{} pods", k8s.pods_pending), Severity::Warning));
        }
    }

    if snapshot.security.available {
        alerts.extend(snapshot.security.alerts.iter().map(|threat| {
            let severity = if threat.kind.is_danger() { Severity::Danger } else { Severity::Warning };
            Alert::new(display_name(threat.kind.name()), threat.message.clone(), severity)
        }));
    }

    alerts
}
