//! DHT11-class single-wire temperature/humidity sensor.
//!
//! The wire protocol is strictly timed: the host pulls the line low for
//! 20 ms to request a frame, the sensor answers with 80 µs presence pulses,
//! then clocks out 40 bits where the length of each high phase encodes the
//! bit value. Bit timing runs on microsecond busy-waits; only the long
//! start pulse yields to the executor.

use canopy_core::filter::DhtFrame;
use embassy_time::{Duration, Timer};
use embedded_hal::delay::DelayNs;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Flex, Pull};

use super::SensorError;

/// Upper bound on any single wait-for-edge, in 1 µs polling steps.
const BIT_TIMEOUT_US: u16 = 1000;

pub struct Dht11<'d> {
    pin: Flex<'d>,
    delay: Delay,
}

impl<'d> Dht11<'d> {
    pub fn new(pin: Flex<'d>) -> Self {
        Self {
            pin,
            delay: Delay::new(),
        }
    }

    /// Runs one full read transaction and decodes the validated frame.
    pub async fn read(&mut self) -> Result<DhtFrame, SensorError> {
        self.start().await?;

        let mut bytes = [0u8; 5];
        for byte in &mut bytes {
            *byte = self.read_byte()?;
        }

        DhtFrame::parse(bytes).ok_or(SensorError::Checksum)
    }

    /// Start handshake: hold the line low, release it, then ride through
    /// the sensor's low/high presence pulses.
    async fn start(&mut self) -> Result<(), SensorError> {
        self.pin.set_as_output();
        self.pin.set_low();
        Timer::after(Duration::from_millis(20)).await;
        self.pin.set_high();

        self.pin.set_as_input(Pull::Up);
        self.delay.delay_us(20);

        for level in [true, false, true] {
            if !self.wait_while(level) {
                return Err(SensorError::NoResponse);
            }
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte <<= 1;

            // 50 µs low preamble before every bit.
            if !self.wait_while(false) {
                return Err(SensorError::BitTimeout);
            }

            // A high phase still going after 30 µs is a one.
            self.delay.delay_us(30);
            if self.pin.is_high() {
                byte |= 0x01;
                if !self.wait_while(true) {
                    return Err(SensorError::BitTimeout);
                }
            }
        }
        Ok(byte)
    }

    /// Busy-waits in 1 µs steps while the line sits at `level`. Returns
    /// `false` if the edge never comes within the bit timeout.
    fn wait_while(&mut self, level: bool) -> bool {
        let mut elapsed: u16 = 0;
        while self.pin.is_high() == level {
            self.delay.delay_us(1);
            elapsed += 1;
            if elapsed > BIT_TIMEOUT_US {
                return false;
            }
        }
        true
    }
}
