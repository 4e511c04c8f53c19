//! Multi-rate source cache.
//!
//! Each data source declares its own refresh interval. [`CachedSource`]
//! recomputes a value only when that interval has elapsed since the last
//! attempt, returns the stored value otherwise, and is the single place where
//! a failed read is turned into the source's sentinel value.

use crate::error::{MonitorError, Result};
use std::fmt;
use std::time::{Duration, Instant};

/// Identifies a polled data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// CPU usage, temperature, frequency.
    Cpu,
    /// Memory counters.
    Memory,
    /// Battery attributes.
    Battery,
    /// Filesystem and volume usage.
    Disk,
    /// Default interface throughput and link state.
    Network,
    /// Public address lookup.
    PublicIp,
    /// Task count and top consumers.
    Processes,
    /// Uptime and hostname.
    System,
    /// Package power draw.
    Energy,
    /// Container runtime listing.
    Containers,
    /// Orchestration cluster state.
    Kubernetes,
    /// Reverse-proxy access log statistics.
    Proxy,
    /// Authentication log threat detection.
    Security,
    /// Newer release check.
    Update,
}

impl SourceId {
    /// Short lowercase name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Battery => "battery",
            Self::Disk => "disk",
            Self::Network => "network",
            Self::PublicIp => "public_ip",
            Self::Processes => "processes",
            Self::System => "system",
            Self::Energy => "energy",
            Self::Containers => "containers",
            Self::Kubernetes => "kubernetes",
            Self::Proxy => "proxy",
            Self::Security => "security",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-read context handed to a [`Source`].
#[derive(Debug, Clone, Copy)]
pub struct ReadContext {
    /// Tick timestamp.
    pub now: Instant,
    /// True during the fast-start tick.
    pub first_tick: bool,
}

/// A data-producing operation.
pub trait Source {
    /// Payload type. The fetch timestamp lives in the cache, not here.
    type Output: Clone;

    /// Which source this is.
    fn id(&self) -> SourceId;

    /// Reads and parses the underlying data.
    fn read(&mut self, ctx: &ReadContext) -> Result<Self::Output>;

    /// Value reported when a read fails.
    fn sentinel(&self) -> Self::Output;

    /// Expensive sources return [`Source::placeholder`] on the first tick.
    fn deferred_at_startup(&self) -> bool {
        false
    }

    /// Fast-start value. Defaults to the sentinel.
    fn placeholder(&self) -> Self::Output {
        self.sentinel()
    }
}

/// TTL memoization around one [`Source`].
#[derive(Debug)]
pub struct CachedSource<S: Source> {
    source: S,
    value: S::Output,
    interval: Duration,
    last_attempt: Option<Instant>,
    last_error: Option<MonitorError>,
}

impl<S: Source> CachedSource<S> {
    /// Wraps `source`, recomputing at most once per `interval`.
    pub fn new(source: S, interval: Duration) -> Self {
        let value = source.placeholder();
        Self { source, value, interval, last_attempt: None, last_error: None }
    }

    /// Brings the stored value up to date for a tick at `now`.
    ///
    /// Returns true when the value was recomputed by this call.
    pub fn fetch(&mut self, now: Instant, first_tick: bool) -> bool {
        if first_tick && self.source.deferred_at_startup() {
            if self.last_attempt.is_none() {
                self.value = self.source.placeholder();
            }
            return false;
        }
        if !self.is_due(now) {
            return false;
        }

        let ctx = ReadContext { now, first_tick };
        match self.source.read(&ctx) {
            Ok(value) => {
                self.value = value;
                self.last_error = None;
            }
            Err(err) => {
                crate::debug!("cache", "{} read failed: {err}", self.source.id());
                self.value = self.source.sentinel();
                self.last_error = Some(err);
            }
        }
        self.last_attempt = Some(now);
        true
    }

    fn is_due(&self, now: Instant) -> bool {
        self.last_attempt.map_or(true, |last| now.saturating_duration_since(last) >= self.interval)
    }

    /// The stored value.
    pub fn current(&self) -> &S::Output {
        &self.value
    }

    /// Error from the most recent attempt, if it failed.
    pub fn last_error(&self) -> Option<&MonitorError> {
        self.last_error.as_ref()
    }

    /// When the value was last recomputed.
    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Forces recomputation on the next fetch.
    pub fn invalidate(&mut self) {
        self.last_attempt = None;
    }

    /// Refresh interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the refresh interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The wrapped source, mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

/// Last-checked timestamp for self-throttled operations.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Allows one run per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Returns true and records `now` if the interval has elapsed.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = self.last.map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }

    /// Makes the next [`Throttle::ready`] call succeed.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Availability of an external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    /// Not probed yet.
    #[default]
    Unknown,
    /// Present and usable.
    Available,
    /// Missing or refused.
    Unavailable,
}

impl Capability {
    /// Maps a probe outcome.
    pub fn from_probe(present: bool) -> Self {
        if present {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    /// True only when known to be available.
    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}
