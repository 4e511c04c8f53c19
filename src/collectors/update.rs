//! Release check against a published version file.

use crate::cache::{ReadContext, Source, SourceId};
use crate::error::{MonitorError, Result};
use crate::subprocess::run_with_timeout_stdout;
use std::cmp::Ordering;
use std::time::Duration;

const CURL_TIMEOUT: Duration = Duration::from_secs(4);

/// Outcome of the release check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Not checked, or the check failed.
    #[default]
    Unknown,
    /// Running the newest version.
    UpToDate,
    /// A newer version is published.
    Available(String),
}

/// Fetches `url` and compares the version it advertises with ours.
#[derive(Debug)]
pub struct UpdateSource {
    url: Option<String>,
    current: String,
}

impl UpdateSource {
    /// Checks `url`, if any, against the crate version.
    pub fn new(url: Option<String>) -> Self {
        Self { url, current: env!("CARGO_PKG_VERSION").to_string() }
    }
}

impl Source for UpdateSource {
    type Output = UpdateStatus;

    fn id(&self) -> SourceId {
        SourceId::Update
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<UpdateStatus> {
        let Some(url) = &self.url else {
            return Ok(UpdateStatus::Unknown);
        };
        let body = run_with_timeout_stdout("curl", &["-s", "-m", "3", url], CURL_TIMEOUT)
            .ok_or_else(|| MonitorError::unavailable("update", "fetch failed"))?;
        let remote = find_version(&body).ok_or_else(|| MonitorError::parse("update", "no version line"))?;
        Ok(match compare_versions(&remote, &self.current) {
            Some(Ordering::Greater) => UpdateStatus::Available(remote),
            _ => UpdateStatus::UpToDate,
        })
    }

    fn sentinel(&self) -> UpdateStatus {
        UpdateStatus::Unknown
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }
}

/// First `version = "x.y.z"` or `VERSION = "x.y.z"` line.
pub fn find_version(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let rest = line.trim_start();
        let rest = rest.strip_prefix("version").or_else(|| rest.strip_prefix("VERSION"))?;
        let rest = rest.trim_start().strip_prefix('=')?.trim();
        let value = rest.strip_prefix('"')?;
        let end = value.find('"')?;
        Some(value[..end].to_string())
    })
}

/// Numeric dotted comparison; `None` when either side has a non-numeric part.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let parse = |v: &str| v.split('.').map(|p| p.parse::<u64>().ok()).collect::<Option<Vec<u64>>>();
    Some(parse(a)?.cmp(&parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_find_version() {
        assert_eq!(find_version("[package]\nname = \"x\"\nversion = \"1.4.2\"\n").as_deref(), Some("1.4.2"));
        assert_eq!(find_version("#!/usr/bin/env python3\nVERSION = \"0.5.0\"\n").as_deref(), Some("0.5.0"));
        assert_eq!(find_version("versions = [1]\n"), None);
        assert_eq!(find_version(""), None);
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("0.10.0", "0.9.9"), Some(Ordering::Greater));
        assert_eq!(compare_versions("1.0", "1.0.0"), Some(Ordering::Less));
        assert_eq!(compare_versions("1.2.3", "1.2.3"), Some(Ordering::Equal));
        assert_eq!(compare_versions("1.2.beta", "1.2.0"), None);
    }

    #[test]
    fn test_without_url_is_unknown() {
        let mut source = UpdateSource::new(None);
        let status = source.read(&ReadContext { now: Instant::now(), first_tick: false }).unwrap();
        assert_eq!(status, UpdateStatus::Unknown);
        assert!(source.deferred_at_startup());
    }
}
