//! Writes a synthetic capture of the DAQ stream
//!
//! Alternates thrust/pressure and temperature frames every 10 ms of device time
//! and drops a stray byte in now and then, so replays exercise resynchronization.
//!
//! Usage:
//!   simulate_capture <out.bin> [seconds]

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use tms_daq_decoder::{encode_frame, Group, Sample};

const SENSOR_PERIOD_MS: u32 = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <out.bin> [seconds]", args[0]);
        std::process::exit(1);
    }
    let seconds: u32 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(10);

    let ticks = seconds
        .checked_mul(1000)
        .map(|ms| ms / SENSOR_PERIOD_MS)
        .ok_or("capture length exceeds the device's u32 millisecond clock")?;
    let mut out = BufWriter::new(File::create(&args[1])?);

    for tick in 0..ticks {
        let t_ms = tick * SENSOR_PERIOD_MS;
        let t = t_ms as f32 / 1000.0;

        // Burn profile: ramp up, hold, tail off
        let grams = match t {
            t if t < 1.0 => 15_000.0 * t,
            t if t < 4.0 => 15_000.0,
            t => (15_000.0 - 5_000.0 * (t - 4.0)).max(0.0),
        };
        let thrust_pressure = Sample {
            group: Group::ThrustPressure,
            timestamp_ms: t_ms,
            value_a: grams,
            value_b: grams / 1000.0,
        };
        out.write_all(&encode_frame(&thrust_pressure))?;

        if tick % 25 == 0 {
            let temperature = Sample {
                group: Group::Temperature,
                timestamp_ms: t_ms,
                value_a: 25.0 + 40.0 * t,
                value_b: 25.0 + 12.0 * t,
            };
            out.write_all(&encode_frame(&temperature))?;
        }

        if tick % 97 == 50 {
            out.write_all(&[0x5A])?;
        }
    }

    out.flush()?;
    println!("Wrote {} ticks to {}", ticks, args[1]);
    Ok(())
}
