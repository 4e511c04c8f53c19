//! Uptime and hostname.

use super::{read_attr, read_file, HostPaths};
use crate::cache::{ReadContext, Source, SourceId};
use crate::error::{MonitorError, Result};
use std::fmt;

/// Time since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uptime {
    /// Whole days.
    pub days: u64,
    /// Remaining hours.
    pub hours: u64,
    /// Remaining minutes.
    pub minutes: u64,
}

impl Uptime {
    /// Splits a seconds count.
    pub fn from_secs(secs: u64) -> Self {
        Self { days: secs / 86_400, hours: secs % 86_400 / 3600, minutes: secs % 3600 / 60 }
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d {}h {}m", self.days, self.hours, self.minutes)
        } else {
            write!(f, "{}h {}m", self.hours, self.minutes)
        }
    }
}

/// Host identity reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    /// Time since boot.
    pub uptime: Uptime,
    /// Kernel hostname, `unknown` when unreadable.
    pub hostname: String,
}

/// Reads `/proc/uptime` and the kernel hostname.
#[derive(Debug)]
pub struct SystemSource {
    paths: HostPaths,
}

impl SystemSource {
    /// Creates a system source reading below `paths`.
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

impl Source for SystemSource {
    type Output = SystemInfo;

    fn id(&self) -> SourceId {
        SourceId::System
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<SystemInfo> {
        let content = read_file("system", &self.paths.proc("uptime"))?;
        let secs = parse_uptime_secs(&content).ok_or_else(|| MonitorError::parse("system", "bad uptime"))?;
        let hostname = read_attr(&self.paths.proc("sys/kernel/hostname")).unwrap_or_else(|| "unknown".to_string());
        Ok(SystemInfo { uptime: Uptime::from_secs(secs), hostname })
    }

    fn sentinel(&self) -> SystemInfo {
        SystemInfo { hostname: "unknown".to_string(), ..SystemInfo::default() }
    }
}

/// First field of `/proc/uptime`, truncated to whole seconds.
pub fn parse_uptime_secs(content: &str) -> Option<u64> {
    let secs: f64 = content.split_whitespace().next()?.parse().ok()?;
    (secs >= 0.0).then_some(secs as u64)
}
