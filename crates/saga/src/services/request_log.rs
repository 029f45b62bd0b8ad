//! Bounded history of requests received by the in-memory services.

use std::collections::VecDeque;

/// Number of requests kept per log before the oldest are dropped.
pub const REQUEST_LOG_CAPACITY: usize = 256;

/// Keeps the most recent requests, dropping the oldest past its capacity.
#[derive(Debug, Clone)]
pub(crate) struct RequestLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RequestLog<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(16)),
            capacity,
        }
    }

    pub(crate) fn record(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns the kept entries, oldest first.
    pub(crate) fn entries(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T: Clone> Default for RequestLog<T> {
    fn default() -> Self {
        Self::with_capacity(REQUEST_LOG_CAPACITY)
    }
}
