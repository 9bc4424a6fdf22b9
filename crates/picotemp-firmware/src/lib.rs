//! ESP32-C6 firmware-specific modules for picotemp
//!
//! This crate contains the hardware-facing halves of the core traits: Wi-Fi
//! and DHCP bring-up, the pooled embassy-net TCP listener, the on-die
//! temperature sensor, and the compile-time Wi-Fi credentials.

#![no_std]

extern crate alloc;

pub mod listener;
pub mod net;
pub mod sensor;
pub mod wifi_secrets;
