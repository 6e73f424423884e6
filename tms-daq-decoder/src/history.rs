//! Fixed-capacity history per channel
//!
//! [`HistoryRing`] is a circular buffer over a preallocated slice: appends
//! overwrite the oldest slot and never reallocate. Rings start full of zeros so a
//! consumer has a complete window to draw before the first sample arrives.
//!
//! [`HistoryRingBuffer`] keeps one ring per channel, each behind its own mutex so
//! the acquisition thread only ever contends with readers of the same channel.

use crate::types::Channel;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Circular buffer of the last `capacity` values
#[derive(Debug, Clone)]
pub struct HistoryRing {
    data: Box<[f64]>,
    /// Slot that the next push overwrites, which is also the oldest value
    head: usize,
}

impl HistoryRing {
    /// Create a ring pre-filled with zeros
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history ring capacity must be non-zero");
        Self {
            data: vec![0.0; capacity].into_boxed_slice(),
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Append a value, evicting the oldest
    pub fn push(&mut self, value: f64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.data.len();
    }

    /// Values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let (newer, older) = self.data.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// One history ring per channel
#[derive(Debug)]
pub struct HistoryRingBuffer {
    rings: [Mutex<HistoryRing>; Channel::COUNT],
}

impl HistoryRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            rings: std::array::from_fn(|_| Mutex::new(HistoryRing::new(capacity))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock(Channel::Thrust).capacity()
    }

    /// Copy of one channel's history, oldest first
    pub fn history(&self, channel: Channel) -> Vec<f64> {
        self.lock(channel).to_vec()
    }

    pub(crate) fn push(&self, channel: Channel, value: f64) {
        self.lock(channel).push(value);
    }

    // Critical sections are a single slot write or a copy, so a poisoned ring
    // is still consistent.
    fn lock(&self, channel: Channel) -> MutexGuard<'_, HistoryRing> {
        self.rings[channel.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
