//! Container runtime listing through the `docker` CLI.

use super::truncate_chars;
use crate::cache::{Capability, ReadContext, Source, SourceId, Throttle};
use crate::error::{MonitorError, Result};
use crate::subprocess::{run_with_timeout, which};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const PS_TIMEOUT: Duration = Duration::from_secs(2);
const STATS_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_LISTED: usize = 10;

/// Container lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Status starts with `Up`.
    Running,
    /// Anything else.
    Stopped,
}

/// One listed container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    /// Short id (12 chars).
    pub id: String,
    /// Name (up to 20 chars).
    pub name: String,
    /// Lifecycle state.
    pub state: ContainerState,
    /// Last image path segment (up to 15 chars).
    pub image: String,
    /// CPU %, from the most recent stats sample.
    pub cpu: f64,
    /// Memory %, from the most recent stats sample.
    pub mem: f64,
}

impl ContainerInfo {
    /// True for running containers.
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Runtime summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSummary {
    /// Runtime reachable.
    pub available: bool,
    /// Running containers.
    pub running: usize,
    /// Stopped containers.
    pub stopped: usize,
    /// All containers.
    pub total: usize,
    /// Running first, then by CPU descending; at most ten.
    pub containers: Vec<ContainerInfo>,
}

/// Lists containers; refreshes per-container stats on its own throttle.
#[derive(Debug)]
pub struct ContainerSource {
    capability: Capability,
    socket: PathBuf,
    stats_throttle: Throttle,
    stats: HashMap<String, (f64, f64)>,
}

impl ContainerSource {
    /// Creates a container source; `docker stats` runs at most once per `stats_interval`.
    pub fn new(stats_interval: Duration) -> Self {
        Self {
            capability: Capability::Unknown,
            socket: PathBuf::from(DOCKER_SOCKET),
            stats_throttle: Throttle::new(stats_interval),
            stats: HashMap::new(),
        }
    }

    fn probe(&mut self) -> bool {
        if self.capability == Capability::Unknown {
            self.capability = Capability::from_probe(which("docker").is_some() && self.socket.exists());
            crate::debug!("containers", "docker capability: {:?}", self.capability);
        }
        self.capability.is_available()
    }

    fn refresh_stats(&mut self) {
        let result = run_with_timeout(
            "docker",
            &["stats", "--no-stream", "--format", "{{.ID}}|{{.CPUPerc}}|{{.MemPerc}}"],
            STATS_TIMEOUT,
        );
        match result.success_stdout() {
            Some(out) => self.stats = parse_stats(out),
            None => crate::trace!("containers", "stats sample skipped"),
        }
    }
}

impl Source for ContainerSource {
    type Output = ContainerSummary;

    fn id(&self) -> SourceId {
        SourceId::Containers
    }

    fn read(&mut self, ctx: &ReadContext) -> Result<ContainerSummary> {
        if !self.probe() {
            return Ok(ContainerSummary::default());
        }

        let result = run_with_timeout("docker", &["ps", "-a", "--format", "{{.ID}}|{{.Names}}|{{.Status}}|{{.Image}}"], PS_TIMEOUT);
        let output = result.stdout_string().unwrap_or_default();
        if output.trim().is_empty() || result.mentions_permission_problem() || output.contains("Cannot connect") {
            self.capability = Capability::Unavailable;
            return Err(MonitorError::unavailable("containers", "docker daemon refused the listing"));
        }

        let mut containers = parse_listing(output);
        let any_running = containers.iter().any(ContainerInfo::is_running);
        if any_running && !ctx.first_tick && self.stats_throttle.ready(ctx.now) {
            self.refresh_stats();
        }
        for container in containers.iter_mut().filter(|c| c.is_running()) {
            if let Some(&(cpu, mem)) = self.stats.get(&container.id) {
                container.cpu = cpu;
                container.mem = mem;
            }
        }
        Ok(summarize(containers))
    }

    fn sentinel(&self) -> ContainerSummary {
        ContainerSummary::default()
    }
}

/// Parses `id|name|status|image` rows; short rows are skipped.
pub fn parse_listing(output: &str) -> Vec<ContainerInfo> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 4 {
                return None;
            }
            let running = parts[2].to_lowercase().starts_with("up");
            let image = parts[3].rsplit('/').next().unwrap_or(parts[3]);
            Some(ContainerInfo {
                id: truncate_chars(parts[0], 12),
                name: truncate_chars(parts[1], 20),
                state: if running { ContainerState::Running } else { ContainerState::Stopped },
                image: truncate_chars(image, 15),
                cpu: 0.0,
                mem: 0.0,
            })
        })
        .collect()
}

/// Parses `id|cpu%|mem%` rows into a map keyed by short id.
pub fn parse_stats(output: &str) -> HashMap<String, (f64, f64)> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 3 {
                return None;
            }
            let cpu = parts[1].trim().trim_end_matches('%').parse().ok()?;
            let mem = parts[2].trim().trim_end_matches('%').parse().ok()?;
            Some((truncate_chars(parts[0], 12), (cpu, mem)))
        })
        .collect()
}

/// Counts states, then orders and caps the list.
pub fn summarize(mut containers: Vec<ContainerInfo>) -> ContainerSummary {
    let running = containers.iter().filter(|c| c.is_running()).count();
    let total = containers.len();
    containers.sort_by(|a, b| b.is_running().cmp(&a.is_running()).then_with(|| b.cpu.total_cmp(&a.cpu)));
    containers.truncate(MAX_LISTED);
    ContainerSummary { available: true, running, stopped: total - running, total, containers }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "0123456789abcdef|web|Up 3 hours|docker.io/library/nginx:1.25\n\
                           fedcba987654|db|Exited (0) 2 days ago|postgres:16\n\
                           aaaaaaaaaaaa|worker-with-a-very-long-name|Up 5 minutes (healthy)|ghcr.io/acme/worker\n\
                           malformed line\n";

    #[test]
    fn test_parse_listing() {
        let containers = parse_listing(LISTING);
        assert_eq!(containers.len(), 3);
        assert_eq!(containers[0].id, "0123456789ab");
        assert_eq!(containers[0].image, "nginx:1.25");
        assert!(containers[0].is_running());
        assert_eq!(containers[1].state, ContainerState::Stopped);
        assert_eq!(containers[2].name, "worker-with-a-very-l");
    }

    #[test]
    fn test_parse_stats() {
        let stats = parse_stats("0123456789abcdef|12.50%|3.10%\naaaaaaaaaaaa|--|1%\n");
        assert_eq!(stats.get("0123456789ab"), Some(&(12.5, 3.1)));
        assert!(!stats.contains_key("aaaaaaaaaaaa"));
    }

    #[test]
    fn test_summary_orders_running_by_cpu() {
        let mut containers = parse_listing(LISTING);
        containers[0].cpu = 1.0;
        containers[2].cpu = 40.0;
        let summary = summarize(containers);

        assert!(summary.available);
        assert_eq!((summary.running, summary.stopped, summary.total), (2, 1, 3));
        let names: Vec<&str> = summary.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["worker-with-a-very-l", "web", "db"]);
    }

    #[test]
    fn test_summary_caps_list() {
        let listing: String = (0..15).map(|i| format!("id{i}|c{i}|Up 1 minute|img\n")).collect();
        let summary = summarize(parse_listing(&listing));
        assert_eq!(summary.total, 15);
        assert_eq!(summary.containers.len(), 10);
    }
}
