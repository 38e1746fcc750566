//! Bounded log of executed requests

use cypherform_protocol::Request;
use std::collections::VecDeque;

/// Default number of requests kept
pub const DEFAULT_LOG_CAPACITY: usize = 5;

/// Ring buffer of the most recent requests
#[derive(Debug, Clone)]
pub struct QueryLog {
    entries: VecDeque<Request>,
    capacity: usize,
    /// Requests logged since creation or the last clear
    total: u64,
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl QueryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Append a request, evicting the oldest when full
    pub fn push(&mut self, request: Request) {
        self.total += 1;
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(request);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Request> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total = 0;
    }
}
