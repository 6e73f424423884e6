//! Byte sources feeding the frame decoder
//!
//! The decoder only needs blocking reads and a one-shot input flush. Any
//! `std::io::Read` can be wrapped in a [`ReaderSource`]; serial ports are opened
//! through [`SerialSource`] when the `serial` feature is enabled.

use std::io::{self, Read};

/// A blocking byte stream with an optional input buffer reset
pub trait ByteSource {
    /// Read up to `buf.len()` bytes, blocking until at least one is available,
    /// the source's own timeout elapses or the stream ends (`Ok(0)`).
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard any bytes received but not yet read
    fn reset_input_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn reset_input_buffer(&mut self) -> io::Result<()> {
        (**self).reset_input_buffer()
    }
}

/// Adapts any reader (captured files, in-memory buffers, pipes)
///
/// Readers have no receive buffer to reset, so stale input cannot be
/// discarded; a replayed capture starts from its first byte.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialSource;

#[cfg(feature = "serial")]
mod serial {
    use super::ByteSource;
    use crate::types::{DaqError, Result};
    use serialport::{ClearBuffer, SerialPort};
    use std::io::{self, Read};
    use std::time::Duration;

    /// Serial port byte source
    pub struct SerialSource {
        port: Box<dyn SerialPort>,
    }

    impl SerialSource {
        /// Open and configure a serial port
        ///
        /// Failure here is a connection error: no acquisition state exists yet.
        pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
            log::info!("Trying to connect to: {} at {} BAUD.", port_name, baud_rate);

            let port = serialport::new(port_name, baud_rate)
                .timeout(timeout)
                .open()
                .map_err(|e| {
                    DaqError::Connection(format!(
                        "Failed to open {} at {} BAUD: {}",
                        port_name, baud_rate, e
                    ))
                })?;

            log::info!("Connected to {} at {} BAUD.", port_name, baud_rate);
            Ok(Self { port })
        }
    }

    impl ByteSource for SerialSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.port.read(buf)
        }

        fn reset_input_buffer(&mut self) -> io::Result<()> {
            self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
        }
    }

    impl std::fmt::Debug for SerialSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SerialSource")
                .field("port", &self.port.name())
                .finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_source_reads_through() {
        let mut source = ReaderSource::new(Cursor::new(vec![1u8, 2, 3]));
        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert!(source.reset_input_buffer().is_ok());
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_serial_open_failure_is_connection_error() {
        let result = SerialSource::open(
            "/dev/tms-daq-does-not-exist",
            115_200,
            std::time::Duration::from_millis(10),
        );
        assert!(matches!(result, Err(crate::DaqError::Connection(_))));
    }
}
