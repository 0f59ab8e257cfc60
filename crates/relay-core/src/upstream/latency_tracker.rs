//! Rolling latency window per endpoint.
//!
//! Keeps the last `capacity` round-trip times in arrival order. Recording into a full
//! window evicts the oldest sample.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Number of samples kept per endpoint.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// FIFO window of recent latency samples, in milliseconds.
///
/// Appends from concurrent requests are serialized by a mutex; the critical section is a
/// push plus an optional pop, so contention stays negligible.
#[derive(Debug)]
pub struct LatencyWindow {
    samples: Mutex<VecDeque<u64>>,
    capacity: usize,
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl LatencyWindow {
    /// Creates a window holding at most `capacity` samples (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub fn record(&self, latency_ms: u64) {
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(latency_ms);
    }

    /// Mean of the samples in the window, `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<f64> {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return None;
        }
        let sum: f64 = samples.iter().map(|&s| s as f64).sum();
        Some(sum / samples.len() as f64)
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    #[must_use]
    pub fn samples(&self) -> Vec<u64> {
        self.samples.lock().iter().copied().collect()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}
