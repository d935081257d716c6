//! Hardware bindings for the canopy-rs node: GPIO/ADC sensor drivers and
//! the alarm output. Everything protocol-shaped lives in `canopy-core`.

#![no_std]

pub mod buzzer;
pub mod sensors;
