//! TMS DAQ CLI Application
//!
//! Runs one acquisition session against the test stand DAQ:
//! - Opens the serial port (or replays a captured stream)
//! - Shows a live terminal readout of the four channels
//! - Stops on Enter, after the configured duration, or when the stream ends
//! - Stores the session log as CSV files, falling back to a temp directory
//!   when the configured one cannot be written
//!
//! Settings come from a TOML file named by `TMS_DAQ_CONFIG`
//! (default `tms-daq.toml`); defaults apply when it does not exist.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tms_daq_decoder::{
    flush_timestamp_tag, AcquisitionEngine, ByteSource, CsvSink, DaqError, ReaderSource,
    SampleSink, SerialSource, SessionReport, StopHandle,
};

mod config;
mod display;

use config::{AppConfig, SourceConfig};
use display::TerminalDisplay;

const DEFAULT_CONFIG: &str = "tms-daq.toml";
/// Directory under the system temp dir used when `log_dir` cannot be written
const FALLBACK_LOG_DIR: &str = "tms-daq-log";

fn main() -> Result<()> {
    let config_path = env::var_os("TMS_DAQ_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = config::load_config_or_default(&config_path)?;

    // Initialize logging
    init_logging(config.logging.verbose, config.logging.quiet);

    log::info!("TMS DAQ CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", tms_daq_decoder::VERSION);
    log::debug!("Configuration: {:?}", config);

    match &config.source {
        SourceConfig::Serial {
            port,
            baud_rate,
            timeout_ms,
        } => {
            let source = SerialSource::open(port, *baud_rate, Duration::from_millis(*timeout_ms))
                .context("Failed to connect to the DAQ")?;
            run_session(source, &config)
        }
        SourceConfig::File { path } => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open capture file: {:?}", path))?;
            log::info!("Replaying capture {:?}", path);
            run_session(ReaderSource::new(BufReader::new(file)), &config)
        }
    }
}

/// Acquire until stopped, then flush the session log
fn run_session<S>(source: S, config: &AppConfig) -> Result<()>
where
    S: ByteSource + Send + 'static,
{
    let mut engine = AcquisitionEngine::with_csv_sink(source, config.acquisition.clone())?;
    let poll = engine.poll();
    log::debug!("History window: {} samples per channel", poll.history_capacity());
    let mut display = TerminalDisplay::new(poll);

    let stop = engine.stop_handle();
    watch_stdin(stop.clone());
    println!("Press Enter to stop acquisition");
    log::info!("Waiting for the first sample, press Enter to abort");

    match engine.start() {
        Ok(()) => {}
        Err(DaqError::StartAborted) => return Ok(()),
        Err(e) => return Err(e).context("Acquisition ended before the first sample"),
    }

    let period = config.display.poll_period();
    let deadline = config.display.duration().map(|d| Instant::now() + d);
    let mut stdout = io::stdout();

    while !stop.is_requested() && !engine.is_finished() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::info!("Session duration reached");
            break;
        }
        display.refresh(&mut stdout)?;
        thread::sleep(period);
    }

    let fallback_dir = env::temp_dir().join(FALLBACK_LOG_DIR);
    match stop_and_store(&mut engine, &mut CsvSink::new(&fallback_dir))? {
        Stored::Primary(report) => {
            display::print_summary(&report);
            if let Some(e) = &report.stream_error {
                log::warn!("Stream ended during the session: {}", e);
            }
        }
        Stored::Fallback { timestamp_tag, rows } => {
            println!();
            println!(
                "Session log ({} rows) stored in {:?} under tag {}",
                rows, fallback_dir, timestamp_tag
            );
        }
    }
    Ok(())
}

/// Where the session log ended up
#[derive(Debug)]
enum Stored {
    /// Flushed to the configured sink
    Primary(SessionReport),
    /// Configured sink failed; rows were written to the fallback sink
    Fallback { timestamp_tag: String, rows: usize },
}

/// Stop the engine and make sure its rows reach some sink
///
/// When the configured sink fails, the rows the engine kept are flushed once
/// more into `fallback`. Only a failure of both loses the session.
fn stop_and_store<S>(
    engine: &mut AcquisitionEngine<S>,
    fallback: &mut dyn SampleSink,
) -> Result<Stored>
where
    S: ByteSource + Send + 'static,
{
    let err = match engine.stop() {
        Ok(report) => return Ok(Stored::Primary(report)),
        Err(e @ DaqError::Flush { .. }) => e,
        Err(e) => return Err(e).context("Failed to stop acquisition"),
    };
    log::error!(
        "Failed to store session log in {:?}: {}",
        engine.config().log_dir,
        err
    );
    if let Some(e) = engine.take_stream_error() {
        log::warn!("Stream ended during the session: {}", e);
    }

    let sample_log = engine
        .take_sample_log()
        .ok_or_else(|| anyhow!("Session log lost after failed flush: {}", err))?;
    let timestamp_tag = flush_timestamp_tag();
    sample_log
        .flush(fallback, &timestamp_tag)
        .with_context(|| format!("Failed to store session log in fallback location ({})", err))?;

    log::warn!("Session log stored in fallback location under tag {}", timestamp_tag);
    Ok(Stored::Fallback {
        timestamp_tag,
        rows: sample_log.total_rows(),
    })
}

/// Request a stop when a line arrives on stdin
///
/// A closed stdin never raises it; such sessions end on duration or stream end.
fn watch_stdin(stop: StopHandle) {
    thread::spawn(move || {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(n) if n > 0 => stop.request_stop(),
            Ok(_) => log::debug!("stdin closed, Enter-to-stop disabled"),
            Err(e) => log::debug!("Cannot read stdin: {}", e),
        }
    });
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
