//! # Bootstrap
//!
//! Linear power-on sequence:
//!
//! 1. Drive the LED high and wait out the power-on settle time
//! 2. Synchronise the clock with the RTC, print the time, move the RTC one
//!    hour ahead, resynchronise and print again
//! 3. Register the three demo contexts
//! 4. Start the scheduler
//!
//! A registration failure is fatal and signalled with an LED blink code.

use crate::console::{print_time, Console};
use crate::tasks;
use kestrel_execution::{ExecError, ExecResult, Kernel, KernelConfig, Priority};
use kestrel_hal::{DigitalOutput, Level, RtcSource};
use core::convert::Infallible;
use core::time::Duration;
use std::sync::Arc;

/// Bootstrap configuration
#[derive(Debug, Clone)]
pub struct BootConfig {
    /// Uptime to wait for before anything is printed
    pub power_on_settle: Duration,
    /// Console baud rate
    pub baud: u32,
    /// Seconds the RTC is moved ahead after the first sync
    pub rtc_adjust_secs: u64,
    /// Console log level
    pub log_level: log::LevelFilter,
    /// Kernel configuration
    pub kernel: KernelConfig,
}

impl BootConfig {
    /// Default power-on settle time: 2 s
    pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);
    /// Default console baud rate
    pub const DEFAULT_BAUD: u32 = 115_200;
    /// Default RTC adjustment: one hour
    pub const DEFAULT_RTC_ADJUST: u64 = 3_600;

    /// Stack budget of the LED context
    pub const BLINK_STACK: usize = 512;
    /// Stack budget of the other demo contexts
    pub const DEMO_STACK: usize = 8_192;

    /// Create default configuration
    pub fn new() -> Self {
        Self {
            power_on_settle: Self::DEFAULT_SETTLE,
            baud: Self::DEFAULT_BAUD,
            rtc_adjust_secs: Self::DEFAULT_RTC_ADJUST,
            log_level: log::LevelFilter::Info,
            kernel: KernelConfig::teensy(),
        }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Power-on sequence and its collaborators
#[derive(Clone)]
pub struct Bootstrap {
    config: BootConfig,
    console: Console,
    led: Arc<dyn DigitalOutput>,
    rtc: Arc<dyn RtcSource>,
}

impl Bootstrap {
    /// Create a bootstrap over the given console, LED and RTC
    pub fn new(
        config: BootConfig,
        console: Console,
        led: Arc<dyn DigitalOutput>,
        rtc: Arc<dyn RtcSource>,
    ) -> Self {
        Self {
            config,
            console,
            led,
            rtc,
        }
    }

    /// Run everything up to, but not including, scheduler start
    pub fn prepare(&self) -> ExecResult<Kernel> {
        log::info!("console at {} baud", self.config.baud);
        if let Err(err) = self.led.set(Level::High) {
            log::warn!("{}: {}", self.led.name(), err);
        }

        let kernel = Kernel::new(self.config.kernel.clone())?;
        kernel.spin_until(self.config.power_on_settle)?;

        self.console.println(&format!(
            "\r\nBooting Kestrel kernel {}. ***\r\n",
            env!("CARGO_PKG_VERSION")
        ));

        self.sync_clock(&kernel);

        let max = Priority::new(kernel.config().max_priority());
        kernel.register(
            "task1",
            Priority::new(2),
            BootConfig::BLINK_STACK,
            tasks::blink(self.led.clone()),
        )?;
        kernel.register(
            "task2",
            max,
            BootConfig::DEMO_STACK,
            tasks::ticker_host(self.console.clone()),
        )?;
        kernel.register(
            "task3",
            Priority::new(3),
            BootConfig::DEMO_STACK,
            tasks::futures_demo(self.console.clone()),
        )?;

        let heap = kernel.heap_stats();
        log::info!(
            "heap: {} of {} bytes used, {} contexts",
            heap.used,
            heap.capacity,
            heap.allocations
        );
        self.console.println("setup(): starting scheduler...");
        self.console.flush();
        Ok(kernel)
    }

    /// RTC sync, one hour forward, sync again; failures only cost the printout
    fn sync_clock(&self, kernel: &Kernel) {
        if kernel.sync_rtc(self.rtc.as_ref()).is_ok() {
            print_time(&self.console, kernel);
        }

        let adjusted = self
            .rtc
            .read()
            .and_then(|now| self.rtc.set(now + self.config.rtc_adjust_secs));
        if let Err(err) = adjusted {
            log::warn!("rtc: adjustment failed: {}", err);
        }

        if kernel.sync_rtc(self.rtc.as_ref()).is_ok() {
            print_time(&self.console, kernel);
        }
        if !kernel.clock().is_synced() {
            log::warn!("clock: no RTC time, running on uptime only");
        }
    }

    /// Boot and hand control to the scheduler
    pub fn run(&self) -> ExecResult<Infallible> {
        let kernel = self.prepare()?;
        kernel.start()
    }

    /// Report a fatal error on the console and play one cycle of its blink code
    pub fn report_fatal(&self, err: &ExecError, delay: impl FnMut(Duration)) {
        log::error!("fatal: {}", err);
        self.console.println(&format!("FATAL: {}", err));
        self.console.flush();
        if let Err(hal) = err.blink_code().play(self.led.as_ref(), delay) {
            log::error!("{}: {}", self.led.name(), hal);
        }
    }

    /// Signal a fatal error forever
    pub fn halt(&self, err: &ExecError) -> ! {
        loop {
            self.report_fatal(err, std::thread::sleep);
        }
    }
}

impl core::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("config", &self.config)
            .field("led", &self.led.name())
            .finish_non_exhaustive()
    }
}
