//! Capacity-bounded FIFO history for waveform and trend views.

use std::collections::VecDeque;

/// Waveform points kept for the PPG trace.
pub const WAVEFORM_CAPACITY: usize = 200;

/// Full samples kept for the per-vital trend (30 s at the default poll rate).
pub const SAMPLE_CAPACITY: usize = 150;

/// Ordered sequence that keeps only the most recent `capacity` items.
///
/// [`push`](Self::push) appends and trims in one `&mut self` call, so no
/// reader can observe the buffer over capacity.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, dropping the oldest entries beyond capacity.
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
