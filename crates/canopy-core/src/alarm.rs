//! Threshold alarm evaluation.
//!
//! Decides each cycle whether the alarm output should be driven, based on
//! the smoothed readings and the configured comfort band. The actual GPIO
//! write stays in the firmware crate; this logic is pure so the toggle
//! cadence can be tested against injected instants.

use embassy_time::{Duration, Instant};

/// On/off cadence of the intermittent mode.
pub const INTERMITTENT_INTERVAL: Duration = Duration::from_millis(500);

/// Acceptable band for each environmental channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvThresholds {
    pub light_min: u16,
    pub light_max: u16,
    pub temp_min: i16,
    pub temp_max: i16,
    pub humi_min: i16,
    pub humi_max: i16,
}

impl EnvThresholds {
    pub const DEFAULT: Self = Self {
        light_min: 200,
        light_max: 700,
        temp_min: 10,
        temp_max: 30,
        humi_min: 30,
        humi_max: 70,
    };

    pub fn in_range(&self, light: u16, temperature: i16, humidity: i16) -> bool {
        (self.light_min..=self.light_max).contains(&light)
            && (self.temp_min..=self.temp_max).contains(&temperature)
            && (self.humi_min..=self.humi_max).contains(&humidity)
    }
}

impl Default for EnvThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a threshold breach is signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmMode {
    /// Sound for as long as any reading is out of range.
    Continuous,
    /// Toggle on/off at [`INTERMITTENT_INTERVAL`] while out of range.
    Intermittent,
    /// Evaluate but never sound.
    Off,
}

pub struct AlarmController {
    thresholds: EnvThresholds,
    mode: AlarmMode,
    sounding: bool,
    last_toggle: Option<Instant>,
}

impl AlarmController {
    pub const fn new() -> Self {
        Self::with(EnvThresholds::DEFAULT, AlarmMode::Continuous)
    }

    pub const fn with(thresholds: EnvThresholds, mode: AlarmMode) -> Self {
        Self {
            thresholds,
            mode,
            sounding: false,
            last_toggle: None,
        }
    }

    pub fn set_thresholds(&mut self, thresholds: EnvThresholds) {
        self.thresholds = thresholds;
    }

    pub fn set_mode(&mut self, mode: AlarmMode) {
        self.mode = mode;
        if mode == AlarmMode::Off {
            self.sounding = false;
        }
    }

    /// Evaluates one cycle and returns whether the output should be driven.
    pub fn update(&mut self, light: u16, temperature: i16, humidity: i16, now: Instant) -> bool {
        if self.thresholds.in_range(light, temperature, humidity) {
            self.sounding = false;
            self.last_toggle = None;
            return false;
        }

        match self.mode {
            AlarmMode::Continuous => {
                self.sounding = true;
            }
            AlarmMode::Off => {
                self.sounding = false;
            }
            AlarmMode::Intermittent => match self.last_toggle {
                None => {
                    self.sounding = true;
                    self.last_toggle = Some(now);
                }
                Some(at) if now.duration_since(at) >= INTERMITTENT_INTERVAL => {
                    self.sounding = !self.sounding;
                    self.last_toggle = Some(now);
                }
                Some(_) => {}
            },
        }
        self.sounding
    }
}

impl Default for AlarmController {
    fn default() -> Self {
        Self::new()
    }
}
