//! Counter-delta calculators.
//!
//! Kernel and hardware counters are cumulative. A [`CounterDelta`] keeps the
//! previous raw sample per key and turns each new reading into a rate. The
//! first reading for a key, and any reading that went backwards, reports 0.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

/// Last-seen cumulative counter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCounterSample {
    /// Counter value.
    pub value: u64,
    /// When it was read.
    pub at: Instant,
}

/// Rate calculator over one or more keyed counters.
#[derive(Debug, Clone)]
pub struct CounterDelta<K> {
    previous: HashMap<K, RawCounterSample>,
}

impl<K> Default for CounterDelta<K> {
    fn default() -> Self {
        Self { previous: HashMap::new() }
    }
}

impl<K: Eq + Hash> CounterDelta<K> {
    /// Creates a calculator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` read at `at` and returns the rate per second since the
    /// previous reading for `key`.
    pub fn rate(&mut self, key: K, value: u64, at: Instant) -> f64 {
        let sample = RawCounterSample { value, at };
        let Some(previous) = self.previous.insert(key, sample) else {
            return 0.0;
        };

        let elapsed = at.saturating_duration_since(previous.at).as_secs_f64();
        if elapsed <= 0.0 || value < previous.value {
            return 0.0;
        }
        (value - previous.value) as f64 / elapsed
    }

    /// Previous sample for `key`, if any.
    pub fn previous(&self, key: &K) -> Option<&RawCounterSample> {
        self.previous.get(key)
    }

    /// True once at least one sample has been recorded for `key`.
    pub fn is_primed(&self, key: &K) -> bool {
        self.previous.contains_key(key)
    }
}

/// Cumulative tick counts for one CPU line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// Time spent idle or waiting on I/O.
    pub idle: u64,
    /// Sum of every accounted state.
    pub total: u64,
}

/// Which CPU counter line a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuKey {
    /// The aggregate `cpu` line.
    Aggregate,
    /// A `cpuN` line.
    Core(usize),
}

/// Usage calculator keeping one previous sample per CPU line.
#[derive(Debug, Clone, Default)]
pub struct CpuUsageTracker {
    previous: HashMap<CpuKey, CpuTimes>,
}

impl CpuUsageTracker {
    /// Creates a tracker with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns usage % since the previous sample for `key` and stores `times`.
    pub fn usage(&mut self, key: CpuKey, times: CpuTimes) -> f64 {
        match self.previous.insert(key, times) {
            Some(previous) => usage_percent(previous, times),
            None => 0.0,
        }
    }
}

/// `100 × (1 − idle_delta / total_delta)`, clamped to `0..=100`.
///
/// A non-positive total delta yields 0.
pub fn usage_percent(previous: CpuTimes, current: CpuTimes) -> f64 {
    let total_delta = current.total as i128 - previous.total as i128;
    if total_delta <= 0 {
        return 0.0;
    }
    let idle_delta = (current.idle as i128 - previous.idle as i128).max(0);
    let usage = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
    usage.clamp(0.0, 100.0)
}
