//! Task count and the heaviest CPU and memory consumers.

use super::HostPaths;
use crate::cache::{ReadContext, Source, SourceId, Throttle};
use crate::error::{MonitorError, Result};
use crate::subprocess::run_with_timeout_stdout;
use std::time::Duration;

const PS_TIMEOUT: Duration = Duration::from_secs(2);
const TOP_LABEL_WIDTH: usize = 25;

/// Process reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Numeric entries in `/proc`.
    pub total: usize,
    /// `command pct%` of the top CPU consumer.
    pub top_cpu: String,
    /// `command pct%` of the top memory consumer.
    pub top_mem: String,
}

#[derive(Debug, Clone, Copy)]
enum SortKey {
    Cpu,
    Mem,
}

impl SortKey {
    fn sort_arg(self) -> &'static str {
        match self {
            Self::Cpu => "--sort=-%cpu",
            Self::Mem => "--sort=-%mem",
        }
    }

    /// Column of `ps aux` holding the percentage.
    fn column(self) -> usize {
        match self {
            Self::Cpu => 2,
            Self::Mem => 3,
        }
    }
}

/// Counts tasks every read; samples `ps` at most once per throttle interval.
#[derive(Debug)]
pub struct ProcessSource {
    paths: HostPaths,
    top_throttle: Throttle,
    top_cpu: String,
    top_mem: String,
}

impl ProcessSource {
    /// Creates a process source; `ps` runs at most once per `top_interval`.
    pub fn new(paths: HostPaths, top_interval: Duration) -> Self {
        Self { paths, top_throttle: Throttle::new(top_interval), top_cpu: String::new(), top_mem: String::new() }
    }

    fn sample_top(key: SortKey) -> String {
        run_with_timeout_stdout("ps", &["aux", key.sort_arg()], PS_TIMEOUT)
            .and_then(|out| parse_ps_top(&out, key.column()))
            .map(|label| shorten_process_label(&label, TOP_LABEL_WIDTH))
            .unwrap_or_default()
    }
}

impl Source for ProcessSource {
    type Output = ProcessSummary;

    fn id(&self) -> SourceId {
        SourceId::Processes
    }

    fn read(&mut self, ctx: &ReadContext) -> Result<ProcessSummary> {
        let total = count_tasks(&self.paths)?;
        if self.top_throttle.ready(ctx.now) {
            self.top_cpu = Self::sample_top(SortKey::Cpu);
            self.top_mem = Self::sample_top(SortKey::Mem);
        }
        Ok(ProcessSummary { total, top_cpu: self.top_cpu.clone(), top_mem: self.top_mem.clone() })
    }

    fn sentinel(&self) -> ProcessSummary {
        ProcessSummary::default()
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }
}

/// Numeric directory names directly below the proc root.
pub fn count_tasks(paths: &HostPaths) -> Result<usize> {
    let entries = std::fs::read_dir(&paths.proc_root)
        .map_err(|e| MonitorError::from_io("processes", &paths.proc_root, &e))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_str().is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())))
        .count())
}

/// `command pct%` from the first data row of `ps aux` output.
pub fn parse_ps_top(output: &str, pct_column: usize) -> Option<String> {
    let row = output.lines().nth(1)?;
    let fields: Vec<&str> = row.split_whitespace().collect();
    let command = fields.get(10)?;
    let pct = fields.get(pct_column)?;
    Some(format!("{command} {pct}%"))
}

/// Shortens `name pct` to `max` characters, keeping the percentage intact.
pub fn shorten_process_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    match label.rsplit_once(' ') {
        Some((name, pct)) => {
            let head: String = name.chars().take(max.saturating_sub(4)).collect();
            format!("{head}… {pct}")
        }
        None => label.chars().take(max).collect(),
    }
}
