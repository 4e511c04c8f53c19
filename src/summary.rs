//! One-line plain-text summary for the headless mode.

use crate::alerts::Alert;
use crate::snapshot::Snapshot;
use std::fmt::Write;

/// Formats `{ts} | CPU: .. | MEM: .. | [PWR: .. | ]ALERTS: ..`.
pub fn format_summary(timestamp: &str, snapshot: &Snapshot, alerts: &[Alert]) -> String {
    let mut line = format!(
        "{timestamp} | CPU: {:5.1}% {:4.1}°C | MEM: {:5.1}% | ",
        snapshot.cpu.usage, snapshot.cpu.temp, snapshot.memory.percent
    );
    if snapshot.energy.available {
        let _ = write!(line, "PWR: {:5.1}W | ", snapshot.energy.watts);
    }
    line.push_str("ALERTS: ");
    if alerts.is_empty() {
        line.push_str("OK");
    } else {
        let joined = alerts.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        line.push_str(&joined);
    }
    line
}
