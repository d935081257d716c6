//! Photoresistor light level over the on-chip ADC.
//!
//! The divider pulls the ADC input down as light increases, so the raw
//! reading is inverted onto a 0..1000 scale where 0 is darkest.

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO1};

const FULL_SCALE: u16 = 4095;

/// Discarded conversions after power-up, until the ADC reads stable.
const WARMUP_READS: usize = 20;

pub struct LightSensor<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO1<'d>, ADC1<'d>>,
}

impl<'d> LightSensor<'d> {
    pub fn new(adc_peripheral: ADC1<'d>, gpio: GPIO1<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        let mut sensor = Self {
            adc: Adc::new(adc_peripheral, config),
            pin,
        };

        for _ in 0..WARMUP_READS {
            let _ = sensor.raw();
        }
        sensor
    }

    fn raw(&mut self) -> u16 {
        // Conversion failure reads as full scale, i.e. darkness.
        nb::block!(self.adc.read_oneshot(&mut self.pin)).unwrap_or(FULL_SCALE)
    }

    /// Current light level on the inverted 0..1000 scale, unsmoothed.
    pub fn read_level(&mut self) -> f64 {
        let raw = self.raw();
        1000.0 - (f64::from(raw) / f64::from(FULL_SCALE)) * 1000.0
    }
}
