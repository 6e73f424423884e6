//! Acquisition engine
//!
//! The engine owns one acquisition thread that pulls frames from the decoder
//! and fans every sample out to the live state (latest values and history) and
//! the session log. Consumers read the live state through [`ConsumerPoll`]
//! handles without ever waiting on the device.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start()--> Running --stop()--> Stopping --join--> Stopped --flush
//! ```
//!
//! `start()` returns once the first sample has been decoded, so a caller never
//! mistakes the zero-filled initial state for live data. A [`StopHandle`] taken
//! before `start()` can abort that wait from another thread. `stop()` is
//! cooperative: the thread notices the request after its in-flight read
//! returns. The session log travels back to the engine when the thread is
//! joined and is flushed to the sink exactly once.

use crate::config::AcquisitionConfig;
use crate::decoder::{DecodedFrame, FrameDecoder};
use crate::poll::{ConsumerPoll, LiveState};
use crate::sample_log::SampleLog;
use crate::sink::{flush_timestamp_tag, CsvSink, SampleSink};
use crate::source::ByteSource;
use crate::types::{DaqError, Group, Result, Sample};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle state of an [`AcquisitionEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Running => write!(f, "running"),
            EngineState::Stopping => write!(f, "stopping"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Counters kept by the acquisition thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    /// Correctly tagged frames decoded
    pub frames: u64,
    pub thrust_pressure_samples: u64,
    pub temperature_samples: u64,
    /// Bytes dropped while resynchronizing
    pub desync_bytes: u64,
    /// Reads that timed out with no complete frame
    pub timeouts: u64,
}

impl AcquisitionStats {
    fn record(&mut self, sample: &Sample) {
        self.frames += 1;
        match sample.group {
            Group::ThrustPressure => self.thrust_pressure_samples += 1,
            Group::Temperature => self.temperature_samples += 1,
        }
    }
}

/// Summary returned by a successful [`AcquisitionEngine::stop`]
#[derive(Debug)]
pub struct SessionReport {
    /// Tag the session log was flushed under
    pub timestamp_tag: String,
    pub thrust_pressure_rows: usize,
    pub temperature_rows: usize,
    pub stats: AcquisitionStats,
    /// Terminal stream failure that ended the loop before `stop()`, if any
    pub stream_error: Option<DaqError>,
}

impl SessionReport {
    pub fn rows(&self, group: Group) -> usize {
        match group {
            Group::ThrustPressure => self.thrust_pressure_rows,
            Group::Temperature => self.temperature_rows,
        }
    }
}

/// Cross-thread stop request for an [`AcquisitionEngine`]
///
/// Raising it ends the acquisition loop after its in-flight read returns. The
/// owner still calls [`AcquisitionEngine::stop`] to join and flush.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// What the acquisition thread hands back on join
struct LoopOutcome {
    log: SampleLog,
    stats: AcquisitionStats,
    fatal: Option<DaqError>,
}

/// Runs the acquisition loop over a byte source
pub struct AcquisitionEngine<S> {
    config: AcquisitionConfig,
    state: EngineState,
    source: Option<S>,
    sink: Box<dyn SampleSink>,
    live: Arc<LiveState>,
    stop_requested: Arc<AtomicBool>,
    handle: Option<JoinHandle<LoopOutcome>>,
    unflushed: Option<SampleLog>,
    stream_error: Option<DaqError>,
}

impl<S> AcquisitionEngine<S>
where
    S: ByteSource + Send + 'static,
{
    /// Create an idle engine
    ///
    /// The source must already be open: connection failures belong to the
    /// caller, before any engine state exists.
    pub fn new(source: S, sink: impl SampleSink + 'static, config: AcquisitionConfig) -> Result<Self> {
        config.validate()?;
        log::debug!("Acquisition config: {:?}", config);

        Ok(Self {
            live: Arc::new(LiveState::new(config.history_capacity)),
            config,
            state: EngineState::Idle,
            source: Some(source),
            sink: Box::new(sink),
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: None,
            unflushed: None,
            stream_error: None,
        })
    }

    /// Create an idle engine that flushes CSV files into `config.log_dir`
    pub fn with_csv_sink(source: S, config: AcquisitionConfig) -> Result<Self> {
        let sink = CsvSink::new(config.log_dir.clone());
        Self::new(source, sink, config)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// New read-only handle onto the live state
    pub fn poll(&self) -> ConsumerPoll {
        ConsumerPoll::new(Arc::clone(&self.live))
    }

    /// Handle that lets another thread request a stop
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_requested),
        }
    }

    /// True once the acquisition thread has exited on its own
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_finished())
    }

    /// Spawn the acquisition thread and wait for the first sample
    ///
    /// If the stream fails before any sample arrives, the thread is joined,
    /// the engine moves to `Stopped` and the stream error is returned. A stop
    /// requested through a [`StopHandle`] during the wait yields
    /// [`DaqError::StartAborted`].
    pub fn start(&mut self) -> Result<()> {
        if self.state != EngineState::Idle {
            return Err(DaqError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        let source = self.source.take().ok_or(DaqError::InvalidState {
            operation: "start",
            state: self.state,
        })?;

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let worker = AcquisitionLoop {
            decoder: FrameDecoder::new(source),
            live: Arc::clone(&self.live),
            stop_requested: Arc::clone(&self.stop_requested),
            settle_delay: self.config.settle_delay(),
            terminal_log: self.config.terminal_log,
            ready: Some(ready_tx),
            log: SampleLog::new(),
            stats: AcquisitionStats::default(),
        };

        let handle = thread::Builder::new()
            .name("tms-daq-acquisition".to_string())
            .spawn(move || worker.run())?;
        self.handle = Some(handle);
        self.state = EngineState::Running;
        log::info!("Acquisition thread started, waiting for first sample");

        if ready_rx.recv().is_ok() {
            log::info!("Receiving samples");
            return Ok(());
        }

        // The thread dropped its ready sender without a sample: it has exited.
        let outcome = self.join();
        self.state = EngineState::Stopped;
        let outcome = outcome?;
        match outcome.fatal {
            Some(e) => Err(e),
            None => {
                log::info!("Acquisition aborted before the first sample");
                Err(DaqError::StartAborted)
            }
        }
    }

    /// Stop the acquisition thread, join it and flush the session log
    ///
    /// A stream failure that already ended the loop is reported in the
    /// returned [`SessionReport`]; the rows gathered before it are still
    /// flushed. If the flush fails the rows stay available through
    /// [`take_sample_log`](Self::take_sample_log).
    pub fn stop(&mut self) -> Result<SessionReport> {
        if self.state != EngineState::Running {
            return Err(DaqError::InvalidState {
                operation: "stop",
                state: self.state,
            });
        }

        self.state = EngineState::Stopping;
        self.stop_requested.store(true, Ordering::Release);
        log::info!("Stopping acquisition");

        let outcome = self.join();
        self.state = EngineState::Stopped;
        let outcome = outcome?;
        log::info!("Disconnected...");

        let timestamp_tag = flush_timestamp_tag();
        match outcome.log.flush(self.sink.as_mut(), &timestamp_tag) {
            Ok(()) => Ok(SessionReport {
                timestamp_tag,
                thrust_pressure_rows: outcome.log.len(Group::ThrustPressure),
                temperature_rows: outcome.log.len(Group::Temperature),
                stats: outcome.stats,
                stream_error: outcome.fatal,
            }),
            Err(e) => {
                log::error!("{}", e);
                self.unflushed = Some(outcome.log);
                self.stream_error = outcome.fatal;
                Err(e)
            }
        }
    }

    /// Rows left behind by a failed flush
    pub fn take_sample_log(&mut self) -> Option<SampleLog> {
        self.unflushed.take()
    }

    /// Stream failure recorded alongside a failed flush
    pub fn take_stream_error(&mut self) -> Option<DaqError> {
        self.stream_error.take()
    }
}

impl<S> AcquisitionEngine<S> {
    fn join(&mut self) -> Result<LoopOutcome> {
        let handle = self.handle.take().ok_or(DaqError::ThreadPanicked)?;
        handle.join().map_err(|_| DaqError::ThreadPanicked)
    }
}

impl<S> Drop for AcquisitionEngine<S> {
    fn drop(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        log::warn!("Acquisition engine dropped while running, stopping");
        self.stop_requested.store(true, Ordering::Release);
        match self.join() {
            Ok(outcome) => {
                let tag = flush_timestamp_tag();
                if let Err(e) = outcome.log.flush(self.sink.as_mut(), &tag) {
                    log::error!("{}", e);
                }
            }
            Err(e) => log::error!("{}", e),
        }
        self.state = EngineState::Stopped;
    }
}

/// State moved onto the acquisition thread
struct AcquisitionLoop<S> {
    decoder: FrameDecoder<S>,
    live: Arc<LiveState>,
    stop_requested: Arc<AtomicBool>,
    settle_delay: Duration,
    terminal_log: bool,
    ready: Option<SyncSender<()>>,
    log: SampleLog,
    stats: AcquisitionStats,
}

impl<S: ByteSource> AcquisitionLoop<S> {
    fn run(mut self) -> LoopOutcome {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        let fatal = match self.decoder.reset_input() {
            Ok(()) => self.read_until_stopped(),
            Err(e) => {
                log::error!("Failed to reset input buffer: {}", e);
                Some(e)
            }
        };

        let pending = self.decoder.pending_bytes();
        if pending > 0 {
            log::debug!("Discarding {} bytes of an incomplete frame", pending);
        }

        LoopOutcome {
            log: self.log,
            stats: self.stats,
            fatal,
        }
    }

    /// Returns the terminal error, or `None` when stopped on request
    fn read_until_stopped(&mut self) -> Option<DaqError> {
        let mut desync_run = 0u64;

        while !self.stop_requested.load(Ordering::Acquire) {
            match self.decoder.next_frame() {
                Ok(DecodedFrame::Sample(sample)) => {
                    if desync_run > 0 {
                        log::info!("Resynchronized after discarding {} bytes", desync_run);
                        desync_run = 0;
                    }
                    self.fan_out(&sample);
                }
                Ok(DecodedFrame::Desync { discarded }) => {
                    if desync_run == 0 {
                        log::warn!(
                            "Unknown frame tag 0x{:02X}, resynchronizing",
                            discarded
                        );
                    }
                    desync_run += 1;
                    self.stats.desync_bytes += 1;
                }
                Err(DaqError::Timeout) => {
                    self.stats.timeouts += 1;
                    log::debug!("Read timed out, still waiting for data");
                }
                Err(e) => {
                    log::warn!("Acquisition loop ended: {}", e);
                    return Some(e);
                }
            }
        }
        None
    }

    fn fan_out(&mut self, sample: &Sample) {
        self.live.apply(sample);
        self.log.append(sample);
        self.stats.record(sample);

        if self.terminal_log {
            log::info!("{}", sample);
        } else {
            log::trace!("{}", sample);
        }

        if let Some(ready) = self.ready.take() {
            // The engine may have given up waiting; nothing to signal then.
            let _ = ready.send(());
        }
    }
}
