//! Reverse-proxy traffic estimated from the tail of an access log.

use crate::cache::{ReadContext, Source, SourceId};
use crate::error::Result;
use crate::logtail::LogTail;
use std::path::PathBuf;

const PROXY_TAIL_LINES: usize = 100;

/// The tail is assumed to span this many seconds.
const ASSUMED_SPAN_SECS: f64 = 60.0;

/// Access-log statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyStats {
    /// Lines in the tail.
    pub requests: usize,
    /// Sum of response sizes.
    pub bytes: u64,
    /// Requests per second over the assumed span.
    pub rps: f64,
    /// Name of the log that produced the figures.
    pub source: Option<String>,
}

/// Tries each configured access log in priority order.
#[derive(Debug)]
pub struct ProxySource {
    logs: Vec<(String, LogTail)>,
}

impl ProxySource {
    /// `logs` are `(name, path)` pairs, highest priority first.
    pub fn new(logs: Vec<(String, PathBuf)>) -> Self {
        Self { logs: logs.into_iter().map(|(name, path)| (name, LogTail::new(path, PROXY_TAIL_LINES))).collect() }
    }
}

impl Source for ProxySource {
    type Output = ProxyStats;

    fn id(&self) -> SourceId {
        SourceId::Proxy
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<ProxyStats> {
        for (name, tail) in &mut self.logs {
            if !tail.path().exists() {
                continue;
            }
            match tail.read() {
                Ok(batch) if !batch.is_empty() => return Ok(summarize(name, &batch.lines)),
                Ok(_) => {}
                Err(err) => crate::debug!("proxy", "{name}: {err}"),
            }
        }
        Ok(ProxyStats::default())
    }

    fn sentinel(&self) -> ProxyStats {
        ProxyStats::default()
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }
}

/// Response size of a common-log-format line: field 10 when numeric, else the
/// last field. Lines with fewer than ten fields carry no size.
pub fn response_bytes(line: &str) -> Option<u64> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 10 {
        return None;
    }
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let field = if is_digits(parts[9]) { parts[9] } else { parts[parts.len() - 1] };
    if is_digits(field) {
        field.parse().ok()
    } else {
        None
    }
}

/// Aggregates one tail.
pub fn summarize(name: &str, lines: &[String]) -> ProxyStats {
    let requests = lines.len();
    ProxyStats {
        requests,
        bytes: lines.iter().filter_map(|l| response_bytes(l)).sum(),
        rps: requests as f64 / ASSUMED_SPAN_SECS,
        source: Some(name.to_string()),
    }
}
