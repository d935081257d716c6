//! Consecutive-failure accounting for sensing and uploads.
//!
//! The counters are owned by the application loop and passed explicitly;
//! nothing here reads the clock on its own. The loop feeds outcomes in,
//! and the return values tell it when to hold off an upload, reinitialize
//! a sensor, or hard-restart the modem link.

use embassy_time::{Duration, Instant};

/// Consecutive failures tolerated before recovery action is demanded.
pub const MAX_CONSECUTIVE_FAILURES: u8 = 3;

/// Minimum gap between upload attempts once one has failed.
pub const UPLOAD_HOLDOFF: Duration = Duration::from_millis(60_000);

/// Rolling health record for the sensing and upload paths.
#[derive(Debug, Default)]
pub struct UplinkHealth {
    sensor_failures: u8,
    network_failures: u8,
    last_attempt: Option<Instant>,
    last_success: Option<Instant>,
}

impl UplinkHealth {
    pub const fn new() -> Self {
        Self {
            sensor_failures: 0,
            network_failures: 0,
            last_attempt: None,
            last_success: None,
        }
    }

    pub fn record_sensor_success(&mut self) {
        self.sensor_failures = 0;
    }

    /// Counts one failed sensor read. Returns `true` when the threshold is
    /// reached; the counter resets so the caller reinitializes once, not on
    /// every following failure.
    pub fn record_sensor_failure(&mut self) -> bool {
        self.sensor_failures += 1;
        if self.sensor_failures >= MAX_CONSECUTIVE_FAILURES {
            self.sensor_failures = 0;
            true
        } else {
            false
        }
    }

    pub fn sensor_failures(&self) -> u8 {
        self.sensor_failures
    }

    pub fn network_failures(&self) -> u8 {
        self.network_failures
    }

    /// Whether an upload should be attempted this cycle: always while the
    /// link is failure-free, otherwise only once the holdoff since the last
    /// attempt has passed.
    pub fn should_upload(&self, now: Instant) -> bool {
        if self.network_failures == 0 {
            return true;
        }
        match self.last_attempt {
            Some(at) => now.duration_since(at) > UPLOAD_HOLDOFF,
            None => true,
        }
    }

    pub fn record_upload_success(&mut self, now: Instant) {
        self.last_attempt = Some(now);
        self.last_success = Some(now);
        self.network_failures = 0;
    }

    /// Counts one failed exchange. Returns `true` when the threshold is
    /// reached and the modem link should be restarted; the caller clears
    /// the counter with [`UplinkHealth::note_restart`] once it has.
    pub fn record_upload_failure(&mut self, now: Instant) -> bool {
        self.last_attempt = Some(now);
        self.network_failures += 1;
        self.network_failures >= MAX_CONSECUTIVE_FAILURES
    }

    pub fn note_restart(&mut self) {
        self.network_failures = 0;
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }
}
