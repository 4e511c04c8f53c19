//! Bounded history buffers feeding trend displays.
//!
//! A [`HistoryBuffer`] always holds exactly its capacity: it starts filled
//! with the zero value of `T` and every push evicts the oldest sample.
//!
//! ```rust
//! use sentinel_monitor::history::HistoryBuffer;
//!
//! let mut cpu = HistoryBuffer::<f64>::zeroed(100);
//! cpu.push(42.0);
//! assert_eq!(cpu.len(), 100);
//! assert_eq!(cpu.latest(), 42.0);
//! ```

use std::collections::VecDeque;

/// Capacity of every tracked series.
pub const HISTORY_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of samples, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone + Default> HistoryBuffer<T> {
    /// Creates a buffer of `capacity` zero values.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn zeroed(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than 0");
        let mut data = VecDeque::with_capacity(capacity);
        data.resize(capacity, T::default());
        Self { data, capacity }
    }

    /// Appends `value`, discarding the oldest sample.
    pub fn push(&mut self, value: T) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }

    /// Copies the samples out, most recent last.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> T {
        self.data.back().cloned().unwrap_or_default()
    }

    /// Returns the last `n` samples (newest last).
    #[must_use]
    pub fn last_n(&self, n: usize) -> Vec<T> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip).cloned().collect()
    }
}

impl<T> HistoryBuffer<T> {
    /// Number of samples held. Always equal to the capacity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: buffers are prefilled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maximum number of samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

impl<T: Clone + Default> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::zeroed(HISTORY_CAPACITY)
    }
}

/// Every tracked series, created once at engine start.
#[derive(Debug, Clone, Default)]
pub struct Histories {
    /// Aggregate CPU usage %.
    pub cpu: HistoryBuffer<f64>,
    /// Per-core CPU usage %, grown to the core count on first read.
    pub cores: Vec<HistoryBuffer<f64>>,
    /// Memory usage %.
    pub memory: HistoryBuffer<f64>,
    /// Receive throughput, KB/s.
    pub rx: HistoryBuffer<f64>,
    /// Transmit throughput, KB/s.
    pub tx: HistoryBuffer<f64>,
    /// Power draw, W.
    pub power: HistoryBuffer<f64>,
    /// Proxy request rate, scaled for display.
    pub proxy_rps: HistoryBuffer<f64>,
    /// Failed logins per security pass.
    pub failed_logins: HistoryBuffer<u64>,
    /// Suspicious IPs per security pass.
    pub suspicious_ips: HistoryBuffer<u64>,
}

impl Histories {
    /// Pushes one sample per core, creating buffers for cores seen for the first time.
    pub fn push_cores(&mut self, per_core: &[f64]) {
        if self.cores.len() < per_core.len() {
            self.cores.resize_with(per_core.len(), HistoryBuffer::default);
        }
        for (buffer, value) in self.cores.iter_mut().zip(per_core) {
            buffer.push(*value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zeroed_is_full_of_defaults() {
        let buffer = HistoryBuffer::<f64>::zeroed(HISTORY_CAPACITY);

        assert_eq!(buffer.len(), 100);
        assert!(buffer.iter().all(|v| *v == 0.0), "prefill should be zero");
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut buffer = HistoryBuffer::<u64>::zeroed(3);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        buffer.push(4);

        assert_eq!(buffer.snapshot(), vec![2, 3, 4]);
        assert_eq!(buffer.latest(), 4);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buffer = HistoryBuffer::<f64>::zeroed(4);
        buffer.push(5.0);
        let mut copy = buffer.snapshot();
        copy[3] = 99.0;

        assert_eq!(buffer.latest(), 5.0, "mutating the copy must not touch the buffer");
    }

    #[test]
    fn test_last_n() {
        let mut buffer = HistoryBuffer::<u64>::zeroed(5);
        for i in 1..=5 {
            buffer.push(i);
        }

        assert_eq!(buffer.last_n(2), vec![4, 5]);
        assert_eq!(buffer.last_n(10).len(), 5);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        let _ = HistoryBuffer::<f64>::zeroed(0);
    }

    #[test]
    fn test_push_cores_grows_once() {
        let mut histories = Histories::default();
        histories.push_cores(&[10.0, 20.0]);
        histories.push_cores(&[30.0, 40.0]);

        assert_eq!(histories.cores.len(), 2);
        assert_eq!(histories.cores[1].last_n(2), vec![20.0, 40.0]);
        assert_eq!(histories.cores[0].len(), HISTORY_CAPACITY);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_length_is_always_capacity(values in proptest::collection::vec(0u64..1000, 0..350)) {
            let mut buffer = HistoryBuffer::<u64>::zeroed(HISTORY_CAPACITY);
            for v in &values {
                buffer.push(*v);
            }
            prop_assert_eq!(buffer.len(), HISTORY_CAPACITY);
        }

        #[test]
        fn prop_order_is_preserved(values in proptest::collection::vec(0u64..1000, 0..350)) {
            let mut buffer = HistoryBuffer::<u64>::zeroed(HISTORY_CAPACITY);
            for v in &values {
                buffer.push(*v);
            }
            let snapshot = buffer.snapshot();
            let kept = values.len().min(HISTORY_CAPACITY);
            prop_assert_eq!(&snapshot[HISTORY_CAPACITY - kept..], &values[values.len() - kept..]);
            prop_assert!(snapshot[..HISTORY_CAPACITY - kept].iter().all(|v| *v == 0));
        }
    }
}
