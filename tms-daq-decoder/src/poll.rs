//! Live state shared with consumers
//!
//! [`LiveState`] pairs the latest-value table with the history rings. Only the
//! acquisition thread writes to it; consumers read through a [`ConsumerPoll`]
//! handle at whatever cadence suits them (a render tick, a terminal refresh).

use crate::history::HistoryRingBuffer;
use crate::latest::LatestValueTable;
use crate::types::{Channel, Sample};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Latest values and history for all four channels
#[derive(Debug)]
pub struct LiveState {
    latest: LatestValueTable,
    history: HistoryRingBuffer,
}

impl LiveState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            latest: LatestValueTable::new(),
            history: HistoryRingBuffer::new(history_capacity),
        }
    }

    pub fn latest(&self) -> &LatestValueTable {
        &self.latest
    }

    pub fn history(&self) -> &HistoryRingBuffer {
        &self.history
    }

    /// Overwrite the channel's latest value and append it to its history
    pub(crate) fn update(&self, channel: Channel, value: f64) {
        self.latest.store(channel, value);
        self.history.push(channel, value);
    }

    /// Apply both channel values of a sample
    pub(crate) fn apply(&self, sample: &Sample) {
        for (channel, value) in sample.channel_values() {
            self.update(channel, value);
        }
    }
}

/// Everything a consumer reads in one poll
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    /// Latest value per channel, in [`Channel::ALL`] order
    pub latest: [f64; Channel::COUNT],
    /// History per channel, oldest first
    pub history: [Vec<f64>; Channel::COUNT],
    /// Time since this handle's previous poll
    pub interval: Option<Duration>,
}

impl PollSnapshot {
    pub fn value(&self, channel: Channel) -> f64 {
        self.latest[channel.index()]
    }

    pub fn history(&self, channel: Channel) -> &[f64] {
        &self.history[channel.index()]
    }
}

/// Read-only handle onto the live state
///
/// Cloning gives an independent handle with its own poll interval clock.
#[derive(Debug, Clone)]
pub struct ConsumerPoll {
    state: Arc<LiveState>,
    last_poll: Option<Instant>,
}

impl ConsumerPoll {
    pub fn new(state: Arc<LiveState>) -> Self {
        Self {
            state,
            last_poll: None,
        }
    }

    pub fn latest(&self, channel: Channel) -> f64 {
        self.state.latest().get(channel)
    }

    pub fn latest_values(&self) -> [f64; Channel::COUNT] {
        self.state.latest().snapshot()
    }

    pub fn history(&self, channel: Channel) -> Vec<f64> {
        self.state.history().history(channel)
    }

    pub fn history_capacity(&self) -> usize {
        self.state.history().capacity()
    }

    /// Read all channels without touching the interval clock
    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            latest: self.latest_values(),
            history: Channel::ALL.map(|channel| self.history(channel)),
            interval: None,
        }
    }

    /// Read all channels and report the time since the previous `poll`
    pub fn poll(&mut self) -> PollSnapshot {
        let now = Instant::now();
        let interval = self.last_poll.map(|last| now.duration_since(last));
        self.last_poll = Some(now);

        PollSnapshot {
            interval,
            ..self.snapshot()
        }
    }
}
