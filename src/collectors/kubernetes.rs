//! Cluster state through the `kubectl` CLI.

use super::truncate_chars;
use crate::cache::{Capability, ReadContext, Source, SourceId};
use crate::error::{MonitorError, Result};
use crate::subprocess::{run_with_timeout_stdout, which};
use std::cmp::Ordering;
use std::time::Duration;

const KUBECTL_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_PODS_SCANNED: usize = 50;
const MAX_LISTED: usize = 10;

/// Coarse pod phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// `Running`.
    Running,
    /// `Pending`.
    Pending,
    /// `Failed`, `Error` or `CrashLoopBackOff`.
    Failed,
    /// Anything else (`Completed`, `Terminating`, ...).
    Other,
}

impl PodPhase {
    /// Classifies a status column value.
    pub fn from_status(status: &str) -> Self {
        match status {
            "Running" => Self::Running,
            "Pending" => Self::Pending,
            "Failed" | "Error" | "CrashLoopBackOff" => Self::Failed,
            _ => Self::Other,
        }
    }
}

/// One listed pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    /// Namespace (up to 10 chars).
    pub namespace: String,
    /// Name (up to 25 chars).
    pub name: String,
    /// Raw `ready/total` column.
    pub ready: String,
    /// Raw status column.
    pub status: String,
    /// Ready containers.
    pub ready_count: u32,
    /// Total containers.
    pub total_count: u32,
}

impl PodInfo {
    /// Phase derived from the status column.
    pub fn phase(&self) -> PodPhase {
        PodPhase::from_status(&self.status)
    }
}

/// Cluster summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubernetesSummary {
    /// A context is configured and reachable.
    pub available: bool,
    /// Current context (up to 20 chars).
    pub context: String,
    /// Nodes listed.
    pub nodes: usize,
    /// Nodes reporting `Ready`.
    pub nodes_ready: usize,
    /// Pods running.
    pub pods_running: usize,
    /// Pods pending.
    pub pods_pending: usize,
    /// Pods failed.
    pub pods_failed: usize,
    /// Non-running pods first; at most ten.
    pub pods: Vec<PodInfo>,
}

/// Reads context, nodes and pods.
#[derive(Debug, Default)]
pub struct KubernetesSource {
    capability: Capability,
}

impl KubernetesSource {
    /// Creates a source; `kubectl` is probed on first read.
    pub fn new() -> Self {
        Self::default()
    }

    fn kubectl(args: &[&str]) -> Option<String> {
        run_with_timeout_stdout("kubectl", args, KUBECTL_TIMEOUT)
    }
}

impl Source for KubernetesSource {
    type Output = KubernetesSummary;

    fn id(&self) -> SourceId {
        SourceId::Kubernetes
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<KubernetesSummary> {
        if self.capability == Capability::Unknown {
            self.capability = Capability::from_probe(which("kubectl").is_some());
        }
        if !self.capability.is_available() {
            return Ok(KubernetesSummary::default());
        }

        let context = Self::kubectl(&["config", "current-context"]).unwrap_or_default();
        let context = context.trim();
        if context.is_empty() || context.to_lowercase().contains("error") {
            return Err(MonitorError::unavailable("kubernetes", "no current context"));
        }

        let nodes = Self::kubectl(&["get", "nodes", "--no-headers"]).unwrap_or_default();
        let pods = Self::kubectl(&["get", "pods", "-A", "--no-headers"]).unwrap_or_default();
        Ok(summarize(context, &nodes, &pods))
    }

    fn sentinel(&self) -> KubernetesSummary {
        KubernetesSummary::default()
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }
}

/// Counts ready nodes in `get nodes --no-headers` output.
pub fn count_nodes(output: &str) -> (usize, usize) {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let ready = lines.iter().filter(|l| l.contains("Ready") && !l.contains("NotReady")).count();
    (lines.len(), ready)
}

/// Parses `get pods -A --no-headers` rows; only the first fifty are scanned.
pub fn parse_pods(output: &str) -> Vec<PodInfo> {
    output
        .lines()
        .take(MAX_PODS_SCANNED)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            let (ready_count, total_count) = parts[2]
                .split_once('/')
                .and_then(|(r, t)| Some((r.parse().ok()?, t.parse().ok()?)))
                .unwrap_or((0, 0));
            Some(PodInfo {
                namespace: truncate_chars(parts[0], 10),
                name: truncate_chars(parts[1], 25),
                ready: parts[2].to_string(),
                status: parts[3].to_string(),
                ready_count,
                total_count,
            })
        })
        .collect()
}

/// Non-running before running, literal `Failed` first, then by name.
fn pod_order(a: &PodInfo, b: &PodInfo) -> Ordering {
    let key = |p: &PodInfo| (p.status == "Running", p.status != "Failed");
    key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
}

/// Builds the summary from raw command outputs.
pub fn summarize(context: &str, nodes_output: &str, pods_output: &str) -> KubernetesSummary {
    let (nodes, nodes_ready) = count_nodes(nodes_output);
    let mut pods = parse_pods(pods_output);
    let count = |phase: PodPhase| pods.iter().filter(|p| p.phase() == phase).count();
    let (pods_running, pods_pending, pods_failed) = (count(PodPhase::Running), count(PodPhase::Pending), count(PodPhase::Failed));

    pods.sort_by(pod_order);
    pods.truncate(MAX_LISTED);

    KubernetesSummary {
        available: true,
        context: truncate_chars(context, 20),
        nodes,
        nodes_ready,
        pods_running,
        pods_pending,
        pods_failed,
        pods,
    }
}
