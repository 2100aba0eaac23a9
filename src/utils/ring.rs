//! Fixed-capacity FIFO history used by the realtime logs and metrics history.

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// Bounded FIFO buffer. Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        debug_assert!(self.items.len() <= self.capacity);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// The most recent `n` entries in arrival order.
    pub fn tail(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        let start = self.items.len().saturating_sub(n);
        self.items.range(start..).cloned().collect()
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(20, 35 ; "location log")]
    #[test_case(15, 16 ; "network log")]
    #[test_case(30, 100 ; "vitals log")]
    #[test_case(50, 60 ; "metrics history")]
    fn keeps_most_recent_entries_in_order(capacity: usize, appends: usize) {
        let mut ring = RingBuffer::new(capacity);
        for i in 0..appends {
            ring.push(i);
        }

        assert_eq!(ring.len(), capacity);
        let expected: Vec<usize> = (appends - capacity..appends).collect();
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn push_reports_evicted_entry() {
        let mut ring = RingBuffer::new(2);
        assert_eq!(ring.push("a"), None);
        assert_eq!(ring.push("b"), None);
        assert_eq!(ring.push("c"), Some("a"));
        assert_eq!(ring.latest(), Some(&"c"));
    }

    #[test]
    fn tail_is_clamped_to_length() {
        let mut ring = RingBuffer::new(5);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.tail(10), vec![1, 2]);
        assert_eq!(ring.tail(1), vec![2]);
        assert!(ring.tail(0).is_empty());
    }
}
