//! Bounded tail reads of growing log files.
//!
//! Only the final byte window of a file is read. The length observed on the
//! previous read marks which of the returned lines are new, so callers that
//! accumulate sliding-window state can skip lines they have already counted.

use crate::error::{MonitorError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes read per requested line.
const BYTES_PER_LINE: u64 = 512;

/// Lines returned by one [`LogTail::read`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBatch {
    /// Up to `max_lines` non-blank lines, oldest first.
    pub lines: Vec<String>,
    /// Index of the first line not seen by the previous read.
    pub fresh_from: usize,
}

impl LogBatch {
    /// Lines not seen by the previous read.
    pub fn fresh(&self) -> &[String] {
        &self.lines[self.fresh_from.min(self.lines.len())..]
    }

    /// True when the tail produced no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Tail reader for one file.
///
/// A final line without its newline is held back until the writer finishes it.
#[derive(Debug, Clone)]
pub struct LogTail {
    path: PathBuf,
    max_lines: usize,
    seen_len: Option<u64>,
}

impl LogTail {
    /// Tails at most `max_lines` lines of `path`.
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self { path: path.into(), max_lines, seen_len: None }
    }

    /// The tailed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forgets the previous read; the next batch is entirely fresh.
    pub fn reset(&mut self) {
        self.seen_len = None;
    }

    /// Reads the final lines of the file.
    pub fn read(&mut self) -> Result<LogBatch> {
        let io_err = |e: std::io::Error| MonitorError::from_io("logtail", &self.path, &e);
        let mut file = File::open(&self.path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();

        let start = len.saturating_sub(self.max_lines as u64 * BYTES_PER_LINE);
        // one byte of lead tells whether `start` sits on a line boundary
        let lead = u64::from(start > 0);
        file.seek(SeekFrom::Start(start - lead)).map_err(io_err)?;
        let mut buf = Vec::new();
        file.take(len - start + lead).read_to_end(&mut buf).map_err(io_err)?;
        let mid_line = lead == 1 && buf.first() != Some(&b'\n');
        let body = buf.get(lead as usize..).unwrap_or_default();

        // an unterminated tail is still being written; leave it for the next read
        let complete = body.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);

        let mut entries: Vec<(u64, String)> = Vec::new();
        let mut offset = start;
        for (index, chunk) in body[..complete].split_inclusive(|b| *b == b'\n').enumerate() {
            let line_start = offset;
            offset += chunk.len() as u64;
            if index == 0 && mid_line {
                continue;
            }
            let text = String::from_utf8_lossy(chunk);
            let text = text.trim_end_matches(['\n', '\r']);
            if !text.trim().is_empty() {
                entries.push((line_start, text.to_string()));
            }
        }
        let excess = entries.len().saturating_sub(self.max_lines);
        entries.drain(..excess);

        let threshold = match self.seen_len {
            Some(prev) if prev <= len => prev,
            _ => 0,
        };
        let fresh_from = entries.iter().position(|(at, _)| *at >= threshold).unwrap_or(entries.len());
        self.seen_len = Some((start + complete as u64).max(threshold));

        Ok(LogBatch { lines: entries.into_iter().map(|(_, line)| line).collect(), fresh_from })
    }
}
