//! Memory collector (`/proc/meminfo`).

use super::{read_file, HostPaths};
use crate::cache::{ReadContext, Source, SourceId};
use crate::error::{MonitorError, Result};

/// Memory usage in MiB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryInfo {
    /// `MemTotal`.
    pub total_mb: u64,
    /// `MemAvailable`.
    pub available_mb: u64,
    /// Total minus available.
    pub used_mb: u64,
    /// Used as a percentage of total.
    pub percent: f64,
}

/// Reads `/proc/meminfo`.
#[derive(Debug)]
pub struct MemorySource {
    paths: HostPaths,
}

impl MemorySource {
    /// Creates a memory source reading below `paths`.
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

impl Source for MemorySource {
    type Output = MemoryInfo;

    fn id(&self) -> SourceId {
        SourceId::Memory
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<MemoryInfo> {
        parse_meminfo(&read_file("memory", &self.paths.proc("meminfo"))?)
    }

    fn sentinel(&self) -> MemoryInfo {
        MemoryInfo::default()
    }
}

/// Parses `/proc/meminfo` (values in kB).
pub fn parse_meminfo(content: &str) -> Result<MemoryInfo> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total_kb = Some(value),
            "MemAvailable:" => available_kb = Some(value),
            _ => {}
        }
    }

    let total_mb = total_kb.ok_or_else(|| MonitorError::parse("memory", "MemTotal missing"))? / 1024;
    let available_mb = available_kb.unwrap_or(0) / 1024;
    let used_mb = total_mb.saturating_sub(available_mb);
    let percent = if total_mb > 0 { used_mb as f64 / total_mb as f64 * 100.0 } else { 0.0 };

    Ok(MemoryInfo { total_mb, available_mb, used_mb, percent })
}
