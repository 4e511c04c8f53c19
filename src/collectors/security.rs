//! Security log source: tails the first readable authentication log and runs
//! a [`ThreatDetector`] pass over it.

use crate::cache::{ReadContext, Source, SourceId};
use crate::error::{ErrorKind, Result};
use crate::logtail::LogTail;
use crate::threat::{SecurityStats, ThreatDetector, ThreatThresholds};
use std::path::PathBuf;

/// Lines examined per pass.
pub const SECURITY_TAIL_LINES: usize = 1000;

/// Tries each configured log in priority order until one yields lines.
#[derive(Debug)]
pub struct SecuritySource {
    logs: Vec<(String, LogTail)>,
    detector: ThreatDetector,
}

impl SecuritySource {
    /// `logs` are `(name, path)` pairs, highest priority first.
    pub fn new(logs: Vec<(String, PathBuf)>, thresholds: ThreatThresholds) -> Self {
        Self {
            logs: logs.into_iter().map(|(name, path)| (name, LogTail::new(path, SECURITY_TAIL_LINES))).collect(),
            detector: ThreatDetector::new(thresholds),
        }
    }

    /// The detector and its window state.
    pub fn detector(&self) -> &ThreatDetector {
        &self.detector
    }
}

impl Source for SecuritySource {
    type Output = SecurityStats;

    fn id(&self) -> SourceId {
        SourceId::Security
    }

    fn read(&mut self, ctx: &ReadContext) -> Result<SecurityStats> {
        let mut denied = false;

        for (name, tail) in &mut self.logs {
            if !tail.path().exists() {
                continue;
            }
            let batch = match tail.read() {
                Ok(batch) => batch,
                Err(err) => {
                    denied |= err.kind() == ErrorKind::PermissionDenied;
                    crate::debug!("security", "{name}: {err}");
                    continue;
                }
            };
            if batch.is_empty() {
                continue;
            }
            crate::trace!("security", "{name}: {} lines, {} fresh", batch.lines.len(), batch.fresh().len());
            return Ok(self.detector.analyze(ctx.now, &batch));
        }

        self.detector.prune(ctx.now);
        Ok(SecurityStats { permission_denied: denied, ..SecurityStats::default() })
    }

    fn sentinel(&self) -> SecurityStats {
        SecurityStats::default()
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }
}
