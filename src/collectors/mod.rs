//! Data sources polled by the engine.
//!
//! Each collector implements [`crate::cache::Source`] and reads either kernel
//! pseudo-files (rooted at [`HostPaths`] so tests can point them at a
//! temporary tree) or the output of a bounded external command.

use crate::error::{MonitorError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod battery;
pub mod containers;
pub mod cpu;
pub mod disk;
pub mod energy;
pub mod kubernetes;
pub mod memory;
pub mod network;
pub mod processes;
pub mod proxy;
pub mod public_ip;
pub mod security;
pub mod system;
pub mod update;
pub mod vpn;

pub use battery::{BatteryInfo, BatterySource, BatteryState};
pub use containers::{ContainerInfo, ContainerSource, ContainerState, ContainerSummary};
pub use cpu::{CpuInfo, CpuSource, FreqStatus, LoadAverage};
pub use disk::{DiskEntry, DiskKind, DiskSource};
pub use energy::{EnergyInfo, EnergySource, PowerSource};
pub use kubernetes::{KubernetesSource, KubernetesSummary, PodInfo, PodPhase};
pub use memory::{MemoryInfo, MemorySource};
pub use network::{ConnectionType, NetworkInfo, NetworkSource};
pub use processes::{ProcessSource, ProcessSummary};
pub use proxy::{ProxySource, ProxyStats};
pub use public_ip::PublicIpSource;
pub use security::SecuritySource;
pub use system::{SystemInfo, SystemSource, Uptime};
pub use update::{UpdateSource, UpdateStatus};
pub use vpn::{VpnPeer, VpnStatus};

/// Roots of the kernel pseudo-filesystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    /// Usually `/proc`.
    pub proc_root: PathBuf,
    /// Usually `/sys`.
    pub sys_root: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self { proc_root: PathBuf::from("/proc"), sys_root: PathBuf::from("/sys") }
    }
}

impl HostPaths {
    /// `proc` and `sys` under a common root, for fixture trees.
    pub fn under(root: &Path) -> Self {
        Self { proc_root: root.join("proc"), sys_root: root.join("sys") }
    }

    /// Path below the proc root.
    pub fn proc(&self, rel: &str) -> PathBuf {
        self.proc_root.join(rel)
    }

    /// Path below the sys root.
    pub fn sys(&self, rel: &str) -> PathBuf {
        self.sys_root.join(rel)
    }
}

/// Reads a whole file, mapping I/O errors to source errors.
pub(crate) fn read_file(collector: &'static str, path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| MonitorError::from_io(collector, path, &e))
}

/// Reads a single-value attribute file, trimmed. `None` when absent or blank.
pub(crate) fn read_attr(path: &Path) -> Option<String> {
    let value = std::fs::read_to_string(path).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Reads and parses a single-value attribute file.
pub(crate) fn read_parsed<T: FromStr>(path: &Path) -> Option<T> {
    read_attr(path)?.parse().ok()
}

/// Truncates to at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
