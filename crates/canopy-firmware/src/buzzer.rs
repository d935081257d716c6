//! Active-low alarm output.

use esp_hal::gpio::Output;

/// Buzzer behind a transistor that sinks current when the pin goes low.
/// Construct the pin at `Level::High` so the alarm boots silent.
pub struct Buzzer<'d> {
    pin: Output<'d>,
}

impl<'d> Buzzer<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }

    /// Drives the output to match the controller's decision for this cycle.
    pub fn apply(&mut self, sounding: bool) {
        if sounding {
            self.pin.set_low();
        } else {
            self.pin.set_high();
        }
    }

    pub fn silence(&mut self) {
        self.pin.set_high();
    }
}
