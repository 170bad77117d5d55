//! # System Clock
//!
//! Wall-clock time derived from the tick counter and an offset taken from
//! a real-time clock.

use crate::config::KernelConfig;
use kestrel_hal::{HalResult, RtcSource};
use spin::Mutex;

/// RTC reading pinned to the tick it was taken at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    epoch: u64,
    tick: u64,
}

/// Tick-based wall clock
#[derive(Debug, Default)]
pub struct SystemClock {
    anchor: Mutex<Option<Anchor>>,
}

impl SystemClock {
    /// Create an unsynchronised clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the clock has been synchronised
    pub fn is_synced(&self) -> bool {
        self.anchor.lock().is_some()
    }

    /// Synchronise with `rtc` at tick `now`
    ///
    /// On failure the previous synchronisation, if any, is kept.
    pub fn sync_rtc(&self, rtc: &dyn RtcSource, now: u64, config: &KernelConfig) -> HalResult<u64> {
        let epoch = rtc.read().map_err(|err| {
            log::warn!("clock: RTC read failed: {}", err);
            err
        })?;
        *self.anchor.lock() = Some(Anchor { epoch, tick: now });
        log::info!(
            "clock: synchronised to {} at uptime {:?}",
            epoch,
            config.duration_of(now)
        );
        Ok(epoch)
    }

    /// Seconds since the Unix epoch at tick `now`
    pub fn now_epoch(&self, now: u64, config: &KernelConfig) -> Option<u64> {
        let anchor = (*self.anchor.lock())?;
        let since = config.duration_of(now.saturating_sub(anchor.tick));
        Some(anchor.epoch + since.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_hal::host::SoftRtc;

    #[test]
    fn test_unsynced() {
        let clock = SystemClock::new();
        assert!(!clock.is_synced());
        assert_eq!(clock.now_epoch(5_000, &KernelConfig::new()), None);
    }

    #[test]
    fn test_epoch_follows_ticks() {
        let config = KernelConfig::new();
        let clock = SystemClock::new();
        let rtc = SoftRtc::new(1_700_000_000);

        assert_eq!(clock.sync_rtc(&rtc, 2_000, &config), Ok(1_700_000_000));
        assert_eq!(clock.now_epoch(2_000, &config), Some(1_700_000_000));
        assert_eq!(clock.now_epoch(4_999, &config), Some(1_700_000_002));
        assert_eq!(clock.now_epoch(5_000, &config), Some(1_700_000_003));
    }

    #[test]
    fn test_failed_sync_keeps_previous() {
        let config = KernelConfig::new();
        let clock = SystemClock::new();
        let rtc = SoftRtc::new(100);
        clock.sync_rtc(&rtc, 0, &config).unwrap();

        rtc.set_failing(true);
        assert!(clock.sync_rtc(&rtc, 1_000, &config).is_err());
        assert_eq!(clock.now_epoch(1_000, &config), Some(101));
    }
}
