//! Bounded per-device reading history.

use crate::detect::Reading;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent readings. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    /// The most recent `min(n, len)` readings, oldest first.
    pub fn snapshot(&self, n: usize) -> Vec<Reading> {
        let skip = self.readings.len().saturating_sub(n);
        self.readings.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
