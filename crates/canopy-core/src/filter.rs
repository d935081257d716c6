//! Sensor data conditioning: frame decoding and Kalman smoothing.
//!
//! Each environmental channel runs a scalar constant-model Kalman filter.
//! Filters are seeded lazily from the first valid sample so a node that
//! boots into unusual conditions does not spend minutes converging from an
//! arbitrary default.

/// Scalar Kalman filter over a constant-signal model.
#[derive(Debug, Clone, Copy)]
pub struct KalmanFilter {
    /// Current state estimate.
    x: f64,
    /// Process noise covariance.
    q: f64,
    /// Measurement noise covariance.
    r: f64,
    /// Estimate error covariance.
    p: f64,
    /// Kalman gain from the last update.
    k: f64,
}

impl KalmanFilter {
    pub const fn new(initial: f64, process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            x: initial,
            q: process_noise,
            r: measurement_noise,
            p: 1.0,
            k: 0.0,
        }
    }

    /// Folds one measurement in and returns the new estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        // Constant model: prediction leaves the state alone and only grows
        // the error covariance by the process noise.
        self.p += self.q;

        self.k = self.p / (self.p + self.r);
        self.x += self.k * (measurement - self.x);
        self.p *= 1.0 - self.k;

        self.x
    }

    pub fn estimate(&self) -> f64 {
        self.x
    }
}

// Per-channel noise tuning. Temperature and humidity drift slowly and the
// sensor is coarse; light is noisier on the measurement side because the
// ADC reading wobbles.
const TEMPERATURE_NOISE: (f64, f64) = (0.02, 1.0);
const HUMIDITY_NOISE: (f64, f64) = (0.01, 2.0);
const LIGHT_NOISE: (f64, f64) = (0.01, 10.0);

/// One 5-byte frame from a DHT11-class single-wire sensor.
///
/// Byte order on the wire: humidity integer, humidity fraction, temperature
/// integer, temperature fraction, checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhtFrame {
    pub humidity_int: u8,
    pub humidity_frac: u8,
    pub temperature_int: u8,
    pub temperature_frac: u8,
}

impl DhtFrame {
    /// Validates the checksum (wrapping sum of the four data bytes) and
    /// splits the frame. Returns `None` on mismatch.
    pub fn parse(bytes: [u8; 5]) -> Option<Self> {
        let sum = bytes[0]
            .wrapping_add(bytes[1])
            .wrapping_add(bytes[2])
            .wrapping_add(bytes[3]);
        if sum != bytes[4] {
            return None;
        }
        Some(Self {
            humidity_int: bytes[0],
            humidity_frac: bytes[1],
            temperature_int: bytes[2],
            temperature_frac: bytes[3],
        })
    }

    pub fn temperature(&self) -> f64 {
        compose_reading(self.temperature_int, self.temperature_frac)
    }

    pub fn humidity(&self) -> f64 {
        compose_reading(self.humidity_int, self.humidity_frac)
    }
}

/// Joins an integer part with the sensor's raw fraction byte, scaling the
/// fraction down by repeated division by ten until it drops to or below one.
pub fn compose_reading(integer: u8, fraction: u8) -> f64 {
    let mut value = f64::from(integer);
    if fraction != 0 {
        let mut decimal = f64::from(fraction);
        while decimal > 1.0 {
            decimal /= 10.0;
        }
        value += decimal;
    }
    value
}

/// Smoothed view of one sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedEnv {
    pub temperature: f64,
    pub humidity: f64,
    /// Rounded to the 0..1000 display/upload scale.
    pub light: u16,
}

/// Per-channel smoothing pipeline for the three environmental signals.
#[derive(Debug, Default)]
pub struct EnvSmoother {
    temperature: Option<KalmanFilter>,
    humidity: Option<KalmanFilter>,
    light: Option<KalmanFilter>,
}

impl EnvSmoother {
    pub const fn new() -> Self {
        Self {
            temperature: None,
            humidity: None,
            light: None,
        }
    }

    /// Runs one raw sample through the filters. The first sample on each
    /// channel seeds that channel's filter and passes through unchanged.
    pub fn smooth(&mut self, temperature: f64, humidity: f64, light: f64) -> SmoothedEnv {
        let temperature = Self::channel(&mut self.temperature, temperature, TEMPERATURE_NOISE);
        let humidity = Self::channel(&mut self.humidity, humidity, HUMIDITY_NOISE);
        let light = Self::channel(&mut self.light, light, LIGHT_NOISE);

        SmoothedEnv {
            temperature,
            humidity,
            light: (light + 0.5) as u16,
        }
    }

    fn channel(slot: &mut Option<KalmanFilter>, raw: f64, (q, r): (f64, f64)) -> f64 {
        match slot {
            Some(filter) => filter.update(raw),
            None => {
                *slot = Some(KalmanFilter::new(raw, q, r));
                raw
            }
        }
    }
}
