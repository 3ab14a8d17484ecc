//! Bounded FIFO of accepted readings.

use crate::reading::RawReading;
use std::collections::VecDeque;

/// Ordered, bounded history. Insertion is always at the tail and overflow
/// evicts the head; entries are never reordered.
#[derive(Debug, Clone)]
pub struct History {
    buf: VecDeque<RawReading>,
    capacity: usize,
}

impl History {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, returning the evicted head if the buffer was full.
    pub fn push(&mut self, r: RawReading) -> Option<RawReading> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(r);
        debug_assert!(self.buf.len() <= self.capacity);
        evicted
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RawReading> + ExactSizeIterator {
        self.buf.iter()
    }

    /// The last `k` entries, oldest first.
    pub fn recent(&self, k: usize) -> impl Iterator<Item = &RawReading> {
        let skip = self.buf.len().saturating_sub(k);
        self.buf.iter().skip(skip)
    }

    /// Copy of the contents, oldest first.
    pub fn to_vec(&self) -> Vec<RawReading> {
        self.buf.iter().copied().collect()
    }
}
