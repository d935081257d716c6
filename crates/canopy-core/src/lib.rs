//! Hardware-independent core library for canopy-rs
//!
//! This crate contains all platform-agnostic logic for the canopy greenhouse
//! monitoring node: the WiFi modem link (byte channel, command sequencing,
//! transparent-mode HTTP exchange, restart supervision), sensor data
//! conditioning, threshold alarming, and the telemetry frame.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests).

#![no_std]

#[cfg(test)]
extern crate std;

pub mod alarm;
pub mod config;
pub mod filter;
pub mod modem;
pub mod telemetry;
