//! # Kestrel stdthread Demo - Entry
//!
//! Host build of the std-style threads demo. The console is standard
//! output, the LED only traces its level changes and the RTC is seeded
//! from the host clock.
//!
//! Usage: `kestrel-stdthread [--for <seconds>]`. Without `--for` the
//! scheduler runs forever; with it, the demo runs for that much virtual
//! time and prints a summary.

mod boot;
mod console;
mod tasks;

use boot::{BootConfig, Bootstrap};
use clap::Parser;
use console::{Console, SinkLogger};
use core::time::Duration;
use kestrel_execution::{ExecError, RunReport};
use kestrel_hal::host::{LogPin, SoftRtc, StdoutSink};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(author, version, about = "Kestrel std-style threads demo", long_about = None)]
struct Args {
    /// Run for this many seconds of virtual time, then print a summary
    #[arg(long = "for", value_name = "SECONDS")]
    window: Option<u64>,
}

impl Args {
    fn observation_window(&self) -> Option<Duration> {
        self.window.map(Duration::from_secs)
    }
}

fn print_report(console: &Console, report: &RunReport) {
    console.println(&format!(
        "halted ({:?}) at {:?}: {} context switches, {} preemptions, {} idle ticks",
        report.reason, report.uptime, report.context_switches, report.preemptions, report.idle_ticks
    ));
    console.println(&format!(
        "heap: {} / {} bytes, high water {}",
        report.heap.used, report.heap.capacity, report.heap.high_water
    ));
    if console.lost_writes() > 0 {
        console.println(&format!("console: {} writes lost", console.lost_writes()));
    }
    for task in &report.tasks {
        console.println(&format!(
            "  {:<10} prio {:<2} {:<10?} {:>6} ticks",
            task.name, task.priority, task.state, task.run_ticks
        ));
    }
    console.flush();
}

fn main() -> ExitCode {
    let window = Args::parse().observation_window();

    let config = BootConfig::new();
    let console = Console::new(Arc::new(StdoutSink::new()));
    if let Err(err) = SinkLogger::new(console.clone(), config.log_level).install() {
        eprintln!("logger: {err}");
    }

    let boot = Bootstrap::new(
        config,
        console.clone(),
        Arc::new(LogPin::new("LED_BUILTIN")),
        Arc::new(SoftRtc::from_system_time()),
    );

    let outcome: Result<(), ExecError> = match window {
        Some(window) => boot
            .prepare()
            .and_then(|kernel| kernel.run_for(window))
            .map(|report| print_report(&console, &report)),
        None => boot.run().map(|never| match never {}),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => boot.halt(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_window() {
        let args = Args::try_parse_from(["kestrel-stdthread"]).unwrap();
        assert_eq!(args.observation_window(), None);

        let args = Args::try_parse_from(["kestrel-stdthread", "--for", "12"]).unwrap();
        assert_eq!(args.observation_window(), Some(Duration::from_secs(12)));

        assert!(Args::try_parse_from(["kestrel-stdthread", "--for"]).is_err());
        assert!(Args::try_parse_from(["kestrel-stdthread", "--for", "soon"]).is_err());
        assert!(Args::try_parse_from(["kestrel-stdthread", "--fast"]).is_err());
    }
}
