//! TMS DAQ Decoder Library
//!
//! Acquisition pipeline for the thrust/pressure/temperature test stand DAQ.
//! The device streams fixed 13-byte tagged frames over a serial link; this
//! library decodes them on a dedicated thread and keeps three views of the data:
//!
//! - the latest value of each of the four channels (thrust, pressure, temp1, temp2)
//! - a fixed-size history ring per channel for live plotting
//! - a full-resolution session log, flushed to CSV when acquisition stops
//!
//! # Architecture
//!
//! ```text
//! ByteSource -> FrameDecoder -> AcquisitionEngine -+-> LatestValueTable  \
//!                                                  +-> HistoryRingBuffer  > ConsumerPoll
//!                                                  +-> SampleLog -> SampleSink (on stop)
//! ```
//!
//! The library does NOT:
//! - Discover or configure devices
//! - Render plots
//! - Parse command lines
//!
//! # Example Usage
//!
//! ```no_run
//! use tms_daq_decoder::{AcquisitionConfig, AcquisitionEngine, Channel, SerialSource};
//! use std::time::Duration;
//!
//! let source = SerialSource::open("/dev/ttyUSB0", 115_200, Duration::from_secs(4)).unwrap();
//! let mut engine = AcquisitionEngine::with_csv_sink(source, AcquisitionConfig::new()).unwrap();
//! let mut poll = engine.poll();
//!
//! engine.start().unwrap();
//! for _ in 0..600 {
//!     let snapshot = poll.poll();
//!     println!("thrust = {:.4} N", snapshot.value(Channel::Thrust));
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//!
//! let report = engine.stop().unwrap();
//! println!("stored {} thrust rows", report.thrust_pressure_rows);
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod engine;
pub mod history;
pub mod latest;
pub mod poll;
pub mod sample_log;
pub mod sink;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use config::AcquisitionConfig;
pub use decoder::{decode_frame, encode_frame, DecodedFrame, FrameDecoder, FRAME_SIZE};
pub use engine::{AcquisitionEngine, AcquisitionStats, EngineState, SessionReport, StopHandle};
pub use history::{HistoryRing, HistoryRingBuffer};
pub use latest::LatestValueTable;
pub use poll::{ConsumerPoll, LiveState, PollSnapshot};
pub use sample_log::SampleLog;
pub use sink::{flush_timestamp_tag, CsvSink, SampleSink};
#[cfg(feature = "serial")]
pub use source::SerialSource;
pub use source::{ByteSource, ReaderSource};
pub use types::{Channel, DaqError, Group, LogRow, Result, Sample};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an engine can be built over an empty reader
        let source = ReaderSource::new(std::io::Cursor::new(Vec::<u8>::new()));
        let engine = AcquisitionEngine::with_csv_sink(source, AcquisitionConfig::new()).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.poll().latest_values(), [0.0; 4]);
    }
}
