//! Frame decoder
//!
//! The device streams fixed 13-byte frames:
//!
//! ```text
//! offset  size  field
//!      0     1  tag (0x00 = thrust/pressure, 0xFF = temperature)
//!      1     4  timestamp, u32 little-endian, milliseconds
//!      5     4  value_a, f32 little-endian
//!      9     4  value_b, f32 little-endian
//! ```
//!
//! [`FrameDecoder`] turns a [`ByteSource`] into a lazy sequence of
//! [`DecodedFrame`]s. When the byte at the frame boundary is not a known tag the
//! stream is out of alignment: the decoder drops that one byte, shifts the window
//! and tries again with one more byte, reporting each dropped byte as
//! [`DecodedFrame::Desync`].

use crate::source::ByteSource;
use crate::types::{DaqError, Group, Result, Sample};
use byteorder::{ByteOrder, LittleEndian};
use std::io::ErrorKind;

/// Size of one frame on the wire
pub const FRAME_SIZE: usize = 13;

/// Result of decoding one frame window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedFrame {
    /// A correctly tagged frame
    Sample(Sample),
    /// The leading byte was not a known tag and has been discarded
    Desync { discarded: u8 },
}

/// Decode a complete frame window
///
/// Never interprets the numeric fields of a mistagged frame.
pub fn decode_frame(frame: &[u8; FRAME_SIZE]) -> DecodedFrame {
    match Group::from_tag(frame[0]) {
        Some(group) => DecodedFrame::Sample(Sample {
            group,
            timestamp_ms: LittleEndian::read_u32(&frame[1..5]),
            value_a: LittleEndian::read_f32(&frame[5..9]),
            value_b: LittleEndian::read_f32(&frame[9..13]),
        }),
        None => DecodedFrame::Desync {
            discarded: frame[0],
        },
    }
}

/// Encode a sample into its wire frame
pub fn encode_frame(sample: &Sample) -> [u8; FRAME_SIZE] {
    let mut frame = [0u8; FRAME_SIZE];
    frame[0] = sample.group.tag();
    LittleEndian::write_u32(&mut frame[1..5], sample.timestamp_ms);
    LittleEndian::write_f32(&mut frame[5..9], sample.value_a);
    LittleEndian::write_f32(&mut frame[9..13], sample.value_b);
    frame
}

/// Streaming decoder over a byte source
///
/// The only state kept between calls is the current, possibly partial, frame
/// window.
pub struct FrameDecoder<S> {
    source: S,
    window: [u8; FRAME_SIZE],
    filled: usize,
    finished: bool,
}

impl<S: ByteSource> FrameDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            window: [0u8; FRAME_SIZE],
            filled: 0,
            finished: false,
        }
    }

    /// Discard stale input on the source and any partial frame
    pub fn reset_input(&mut self) -> Result<()> {
        self.filled = 0;
        self.source.reset_input_buffer()?;
        Ok(())
    }

    /// Read and decode the next frame window
    ///
    /// Blocks until a full window is available. Returns
    /// [`DaqError::Timeout`] if the source timed out mid-window; the bytes read
    /// so far are kept and the next call resumes the same frame. End of stream
    /// and other I/O failures are terminal.
    pub fn next_frame(&mut self) -> Result<DecodedFrame> {
        self.fill_window()?;

        let decoded = decode_frame(&self.window);
        match decoded {
            DecodedFrame::Sample(_) => self.filled = 0,
            DecodedFrame::Desync { .. } => {
                self.window.copy_within(1.., 0);
                self.filled = FRAME_SIZE - 1;
            }
        }
        Ok(decoded)
    }

    /// Number of bytes of the next frame already buffered
    pub fn pending_bytes(&self) -> usize {
        self.filled
    }

    fn fill_window(&mut self) -> Result<()> {
        while self.filled < FRAME_SIZE {
            match self.source.read(&mut self.window[self.filled..]) {
                Ok(0) => return Err(DaqError::StreamClosed),
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(DaqError::Timeout)
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Err(DaqError::StreamClosed)
                }
                Err(e) => return Err(DaqError::Io(e)),
            }
        }
        Ok(())
    }
}

impl<S: ByteSource> Iterator for FrameDecoder<S> {
    type Item = Result<DecodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                if e.is_terminal() {
                    self.finished = true;
                }
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReaderSource;
    use std::collections::VecDeque;
    use std::io::{self, Cursor};

    fn frame(tag: u8, timestamp_ms: u32, a: f32, b: f32) -> Vec<u8> {
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&timestamp_ms.to_le_bytes());
        bytes.extend_from_slice(&a.to_le_bytes());
        bytes.extend_from_slice(&b.to_le_bytes());
        bytes
    }

    fn decoder(bytes: Vec<u8>) -> FrameDecoder<ReaderSource<Cursor<Vec<u8>>>> {
        FrameDecoder::new(ReaderSource::new(Cursor::new(bytes)))
    }

    /// Hands out scripted read results, one per call
    struct ScriptedSource {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ByteSource for ScriptedSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_decode_thrust_pressure_frame() {
        let bytes = frame(0x00, 1000, 100.0, 2.0);
        let window: [u8; FRAME_SIZE] = bytes.try_into().unwrap();

        let DecodedFrame::Sample(sample) = decode_frame(&window) else {
            panic!("expected a sample");
        };
        assert_eq!(sample.group, Group::ThrustPressure);
        assert_eq!(sample.timestamp_ms, 1000);
        assert_eq!(sample.value_a, 100.0);
        assert_eq!(sample.value_b, 2.0);
    }

    #[test]
    fn test_decode_temperature_frame() {
        let bytes = frame(0xFF, 42, 25.0, 26.0);
        let window: [u8; FRAME_SIZE] = bytes.try_into().unwrap();

        let DecodedFrame::Sample(sample) = decode_frame(&window) else {
            panic!("expected a sample");
        };
        assert_eq!(sample.group, Group::Temperature);
        assert_eq!(sample.timestamp_s(), 0.042);
        assert_eq!(sample.value_a, 25.0);
        assert_eq!(sample.value_b, 26.0);
    }

    #[test]
    fn test_unknown_tag_is_desync() {
        let mut window = [0u8; FRAME_SIZE];
        window[0] = 0x42;
        assert_eq!(decode_frame(&window), DecodedFrame::Desync { discarded: 0x42 });
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        let sample = Sample {
            group: Group::Temperature,
            timestamp_ms: 0x0102_0304,
            value_a: 1.5,
            value_b: -3.25,
        };
        let encoded = encode_frame(&sample);
        assert_eq!(encoded.to_vec(), frame(0xFF, 0x0102_0304, 1.5, -3.25));
        assert_eq!(encoded[1..5], [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_resync_after_garbage_byte() {
        let mut bytes = vec![0x42];
        bytes.extend(frame(0x00, 2000, 110.0, 2.1));
        let mut decoder = decoder(bytes);

        assert_eq!(
            decoder.next_frame().unwrap(),
            DecodedFrame::Desync { discarded: 0x42 }
        );
        let DecodedFrame::Sample(sample) = decoder.next_frame().unwrap() else {
            panic!("expected a sample after resync");
        };
        assert_eq!(sample.timestamp_ms, 2000);
        assert_eq!(sample.value_a, 110.0);
        assert_eq!(sample.value_b, 2.1);
        assert!(matches!(decoder.next_frame(), Err(DaqError::StreamClosed)));
    }

    #[test]
    fn test_resync_skips_several_bytes() {
        let mut bytes = vec![0x10, 0x20, 0x30];
        bytes.extend(frame(0xFF, 7, 20.0, 21.0));
        let frames: Vec<_> = decoder(bytes).filter_map(|r| r.ok()).collect();

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0], DecodedFrame::Desync { discarded: 0x10 });
        assert_eq!(frames[1], DecodedFrame::Desync { discarded: 0x20 });
        assert_eq!(frames[2], DecodedFrame::Desync { discarded: 0x30 });
        assert!(matches!(frames[3], DecodedFrame::Sample(s) if s.timestamp_ms == 7));
    }

    #[test]
    fn test_partial_reads_are_reassembled() {
        let bytes = frame(0x00, 5, 1.0, 2.0);
        let mut source = ScriptedSource {
            steps: VecDeque::new(),
        };
        for chunk in bytes.chunks(4) {
            source.steps.push_back(Ok(chunk.to_vec()));
        }
        source
            .steps
            .insert(1, Err(io::Error::from(io::ErrorKind::Interrupted)));

        let mut decoder = FrameDecoder::new(source);
        assert!(matches!(
            decoder.next_frame().unwrap(),
            DecodedFrame::Sample(s) if s.timestamp_ms == 5
        ));
    }

    #[test]
    fn test_timeout_keeps_partial_frame() {
        let bytes = frame(0xFF, 9, 3.0, 4.0);
        let source = ScriptedSource {
            steps: VecDeque::from(vec![
                Ok(bytes[..6].to_vec()),
                Err(io::Error::from(io::ErrorKind::TimedOut)),
                Ok(bytes[6..].to_vec()),
            ]),
        };
        let mut decoder = FrameDecoder::new(source);

        assert!(matches!(decoder.next_frame(), Err(DaqError::Timeout)));
        assert_eq!(decoder.pending_bytes(), 6);
        assert!(matches!(
            decoder.next_frame().unwrap(),
            DecodedFrame::Sample(s) if s.timestamp_ms == 9
        ));
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_io_failure_is_terminal() {
        let source = ScriptedSource {
            steps: VecDeque::from(vec![Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "unplugged",
            ))]),
        };
        let mut decoder = FrameDecoder::new(source);

        assert!(matches!(decoder.next(), Some(Err(DaqError::Io(_)))));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_truncated_stream_ends_with_stream_closed() {
        let mut bytes = frame(0x00, 1, 1.0, 1.0);
        bytes.extend_from_slice(&[0x00, 0x01, 0x02]);
        let results: Vec<_> = decoder(bytes).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DaqError::StreamClosed)));
    }
}
