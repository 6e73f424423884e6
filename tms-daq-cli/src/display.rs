//! Terminal readout of the live channels
//!
//! Polls the engine's live state at the configured rate and redraws a single
//! status line: the interval since the previous refresh, then each channel's
//! latest value with the range of its history window. A value outside the
//! channel's nominal display range is marked with `!`.

use std::fmt::Write as _;
use std::io::{self, Write};
use tms_daq_decoder::{Channel, ConsumerPoll, Group, PollSnapshot, SessionReport};

pub struct TerminalDisplay {
    poll: ConsumerPoll,
}

impl TerminalDisplay {
    pub fn new(poll: ConsumerPoll) -> Self {
        Self { poll }
    }

    /// Poll once and redraw the status line in place
    pub fn refresh(&mut self, out: &mut impl Write) -> io::Result<()> {
        let snapshot = self.poll.poll();
        write!(out, "\r{}", render_line(&snapshot))?;
        out.flush()
    }
}

/// Format one status line from a snapshot
pub fn render_line(snapshot: &PollSnapshot) -> String {
    let mut line = match snapshot.interval {
        Some(interval) => format!("Plot Interval = {}ms", interval.as_millis()),
        None => "Plot Interval = -".to_string(),
    };

    for channel in Channel::ALL {
        let value = snapshot.value(channel);
        let (min, max) = window_range(snapshot.history(channel));
        let _ = write!(
            line,
            " | [{}] = {:.4}{} ({:.2}..{:.2})",
            channel.label(),
            value,
            if in_display_range(channel, value) { "" } else { "!" },
            min,
            max
        );
    }
    line
}

fn in_display_range(channel: Channel, value: f64) -> bool {
    let (lo, hi) = channel.display_range();
    (lo..=hi).contains(&value)
}

fn window_range(history: &[f64]) -> (f64, f64) {
    history
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Print the end-of-session summary
pub fn print_summary(report: &SessionReport) {
    println!();
    println!("═══════════════════════════════════════════════");
    println!("  Session Summary");
    println!("═══════════════════════════════════════════════");
    println!("  Frames decoded:   {}", report.stats.frames);
    for group in Group::ALL {
        println!("  {:<17} {} rows", format!("{}:", group), report.rows(group));
    }
    println!("  Desync bytes:     {}", report.stats.desync_bytes);
    println!("  Read timeouts:    {}", report.stats.timeouts);
    println!("  Log tag:          {}", report.timestamp_tag);
    if let Some(e) = &report.stream_error {
        println!("  Stream ended:     {}", e);
    }
}
