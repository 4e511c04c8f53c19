//! One tick's immutable view of every source.

use crate::collectors::{
    BatteryInfo, ContainerSummary, CpuInfo, DiskEntry, EnergyInfo, KubernetesSummary, MemoryInfo, NetworkInfo,
    ProcessSummary, ProxyStats, SystemInfo, UpdateStatus,
};
use crate::history::Histories;
use crate::layout::PanelDemands;
use crate::threat::SecurityStats;

/// Copies of the history series, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trends {
    /// Aggregate CPU %.
    pub cpu: Vec<f64>,
    /// Per-core CPU %.
    pub cores: Vec<Vec<f64>>,
    /// Memory %.
    pub memory: Vec<f64>,
    /// Receive KB/s.
    pub rx: Vec<f64>,
    /// Transmit KB/s.
    pub tx: Vec<f64>,
    /// Power W.
    pub power: Vec<f64>,
    /// Proxy requests, scaled.
    pub proxy_rps: Vec<f64>,
    /// Failed logins per pass.
    pub failed_logins: Vec<u64>,
    /// Suspicious addresses per pass.
    pub suspicious_ips: Vec<u64>,
}

impl From<&Histories> for Trends {
    fn from(h: &Histories) -> Self {
        Self {
            cpu: h.cpu.snapshot(),
            cores: h.cores.iter().map(|c| c.snapshot()).collect(),
            memory: h.memory.snapshot(),
            rx: h.rx.snapshot(),
            tx: h.tx.snapshot(),
            power: h.power.snapshot(),
            proxy_rps: h.proxy_rps.snapshot(),
            failed_logins: h.failed_logins.snapshot(),
            suspicious_ips: h.suspicious_ips.snapshot(),
        }
    }
}

/// Everything the evaluator, allocator and renderer need for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// True for the fast-start tick.
    pub loading: bool,
    /// CPU reading.
    pub cpu: CpuInfo,
    /// Memory reading.
    pub memory: MemoryInfo,
    /// Battery reading.
    pub battery: BatteryInfo,
    /// Filesystems and volumes.
    pub disks: Vec<DiskEntry>,
    /// Network reading.
    pub network: NetworkInfo,
    /// Public address, `Checking...` or `N/A`.
    pub public_ip: String,
    /// Task count and top consumers.
    pub processes: ProcessSummary,
    /// Uptime and hostname.
    pub system: SystemInfo,
    /// Power draw.
    pub energy: EnergyInfo,
    /// Container runtime.
    pub containers: ContainerSummary,
    /// Cluster.
    pub kubernetes: KubernetesSummary,
    /// Access-log statistics.
    pub proxy: ProxyStats,
    /// Threat detector pass.
    pub security: SecurityStats,
    /// Release check.
    pub update: UpdateStatus,
    /// History copies.
    pub trends: Trends,
}

impl Snapshot {
    /// Rows the power readout occupies above the group panels.
    pub fn power_readout_rows(&self) -> u16 {
        let mut rows = 0;
        if self.energy.available {
            rows += 2;
        }
        if self.battery.present {
            if rows > 0 {
                rows += 1;
            }
            rows += 2;
            if self.battery.health > 0.0 {
                rows += 1;
            }
            if self.battery.power_w > 0.0 {
                rows += 1;
            }
        }
        rows.max(1)
    }

    /// Group demands; unavailable integrations are inactive panels.
    pub fn panel_demands(&self) -> PanelDemands {
        PanelDemands {
            containers: self.containers.available.then_some(self.containers.running),
            pods: self.kubernetes.available.then_some(self.kubernetes.pods.len()),
            security: self.security.available.then_some(self.security.suspicious_ips.len()),
            reserved_rows: self.power_readout_rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_CAPACITY;

    #[test]
    fn test_readout_rows() {
        let mut snap = Snapshot::default();
        assert_eq!(snap.power_readout_rows(), 1);

        snap.energy.available = true;
        assert_eq!(snap.power_readout_rows(), 2);

        snap.battery.present = true;
        snap.battery.health = 91.0;
        snap.battery.power_w = 7.5;
        assert_eq!(snap.power_readout_rows(), 7);

        snap.energy.available = false;
        assert_eq!(snap.power_readout_rows(), 4);
    }

    #[test]
    fn test_panel_demands_follow_availability() {
        let mut snap = Snapshot::default();
        snap.containers.available = true;
        snap.containers.running = 4;
        snap.security.available = true;
        snap.security.suspicious_ips = vec![("10.0.0.1".into(), 5)];

        let d = snap.panel_demands();
        assert_eq!(d.containers, Some(4));
        assert_eq!(d.pods, None);
        assert_eq!(d.security, Some(1));
        assert_eq!(d.reserved_rows, 1);
    }

    #[test]
    fn test_trends_copy_full_histories() {
        let mut h = Histories::default();
        h.cpu.push(42.0);
        h.push_cores(&[1.0, 2.0]);
        let trends = Trends::from(&h);

        assert_eq!(trends.cpu.len(), HISTORY_CAPACITY);
        assert_eq!(trends.cpu.last(), Some(&42.0));
        assert_eq!(trends.cores.len(), 2);
        assert_eq!(trends.failed_logins.len(), HISTORY_CAPACITY);
    }
}
