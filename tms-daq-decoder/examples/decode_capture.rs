//! Standalone capture decoder
//!
//! Decodes a raw byte capture of the DAQ serial stream and prints every sample,
//! followed by a summary of frames, groups and resynchronization.
//!
//! Usage:
//!   decode_capture <capture.bin> [--limit <count>]

use std::env;
use std::fs::File;
use std::io::BufReader;
use tms_daq_decoder::{DaqError, DecodedFrame, FrameDecoder, Group, ReaderSource};

#[derive(Default)]
struct CaptureStats {
    frames: usize,
    thrust_pressure: usize,
    temperature: usize,
    desync_bytes: usize,
    first_time_s: Option<f64>,
    last_time_s: Option<f64>,
}

impl CaptureStats {
    fn print_summary(&self) {
        println!("\n=== CAPTURE SUMMARY ===");
        println!("Frames decoded: {}", self.frames);
        println!("Thrust/pressure samples: {}", self.thrust_pressure);
        println!("Temperature samples: {}", self.temperature);
        println!("Bytes discarded while resynchronizing: {}", self.desync_bytes);
        if let (Some(first), Some(last)) = (self.first_time_s, self.last_time_s) {
            println!("Device time span: {:.3}s .. {:.3}s", first, last);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <capture.bin> [--limit <count>]", args[0]);
        std::process::exit(1);
    }

    let limit: Option<usize> = match args.get(2).map(String::as_str) {
        Some("--limit") => Some(args.get(3).ok_or("--limit needs a value")?.parse()?),
        _ => None,
    };

    let file = File::open(&args[1])?;
    let decoder = FrameDecoder::new(ReaderSource::new(BufReader::new(file)));

    println!("=== DECODING CAPTURE {} ===\n", args[1]);
    let mut stats = CaptureStats::default();

    for result in decoder {
        match result {
            Ok(DecodedFrame::Sample(sample)) => {
                stats.frames += 1;
                match sample.group {
                    Group::ThrustPressure => stats.thrust_pressure += 1,
                    Group::Temperature => stats.temperature += 1,
                }
                stats.first_time_s.get_or_insert(sample.timestamp_s());
                stats.last_time_s = Some(sample.timestamp_s());

                if limit.map_or(true, |max| stats.frames <= max) {
                    println!("[{}] {}", sample.group, sample);
                }
            }
            Ok(DecodedFrame::Desync { discarded }) => {
                stats.desync_bytes += 1;
                println!("  (discarded 0x{:02X})", discarded);
            }
            Err(DaqError::StreamClosed) => break,
            Err(e) => {
                eprintln!("Error decoding capture: {}", e);
                break;
            }
        }
    }

    stats.print_summary();
    Ok(())
}
