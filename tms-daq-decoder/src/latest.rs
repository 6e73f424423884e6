//! Most recent value per channel
//!
//! Each slot is an `AtomicU64` holding the bit pattern of an `f64`, so a reader
//! always sees a whole value written by the acquisition thread. Slots are
//! independent: a snapshot of all four is not taken atomically.

use crate::types::Channel;
use std::sync::atomic::{AtomicU64, Ordering};

/// Latest decoded value for each of the four channels, zero until written
#[derive(Debug)]
pub struct LatestValueTable {
    slots: [AtomicU64; Channel::COUNT],
}

impl LatestValueTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(0.0f64.to_bits())),
        }
    }

    /// Current value of one channel
    pub fn get(&self, channel: Channel) -> f64 {
        f64::from_bits(self.slots[channel.index()].load(Ordering::Acquire))
    }

    /// All four channels in slot order, each read independently
    pub fn snapshot(&self) -> [f64; Channel::COUNT] {
        Channel::ALL.map(|channel| self.get(channel))
    }

    pub(crate) fn store(&self, channel: Channel, value: f64) {
        self.slots[channel.index()].store(value.to_bits(), Ordering::Release);
    }
}

impl Default for LatestValueTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_initialized() {
        let table = LatestValueTable::new();
        assert_eq!(table.snapshot(), [0.0; 4]);
    }

    #[test]
    fn test_last_write_wins() {
        let table = LatestValueTable::new();
        table.store(Channel::Pressure, 2.0);
        table.store(Channel::Pressure, 2.1);
        assert_eq!(table.get(Channel::Pressure), 2.1);
        assert_eq!(table.get(Channel::Thrust), 0.0);
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let table = Arc::new(LatestValueTable::new());
        let writer = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..10_000u32 {
                    let value = if i % 2 == 0 { 1.0e300 } else { -7.5e-300 };
                    table.store(Channel::Temp1, value);
                }
            })
        };

        for _ in 0..10_000 {
            let value = table.get(Channel::Temp1);
            assert!(value == 0.0 || value == 1.0e300 || value == -7.5e-300);
        }
        writer.join().unwrap();
    }
}
